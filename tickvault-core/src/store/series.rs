//! Row-identified series tables.
//!
//! One table per (series, interval) key. The primary key is a dense integer
//! row ID assigned in insertion order, starting at 0 — oldest row lowest.
//! Timestamps are stored as TEXT in the interval's wire format, which orders
//! lexicographically the same way the timestamps order, so range and
//! directional queries compare strings directly.

use std::fs;
use std::path::Path;

use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use crate::domain::{Interval, SeriesPoint, StoredPoint, TableKey};
use crate::store::StoreError;

/// Which side of a boundary date a row lookup may land on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchDirection {
    /// Nearest row with timestamp at or after the date.
    Forward,
    /// Nearest row with timestamp at or before the date.
    Backward,
    /// The row at exactly the date.
    Exact,
}

/// Catalog entry describing one stored series.
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    pub table_name: String,
    pub symbol: String,
    pub interval: Interval,
    pub first_ts: Option<NaiveDateTime>,
    pub last_ts: Option<NaiveDateTime>,
    pub row_count: i64,
    pub batch_hash: String,
    pub updated_at: String,
}

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS series_catalog (
    table_name TEXT PRIMARY KEY,
    symbol TEXT NOT NULL,
    interval TEXT NOT NULL,
    first_ts TEXT,
    last_ts TEXT,
    row_count INTEGER NOT NULL DEFAULT 0,
    batch_hash TEXT NOT NULL DEFAULT '',
    updated_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS stocks (
    id INTEGER PRIMARY KEY,
    symbol TEXT NOT NULL,
    name TEXT NOT NULL,
    currency TEXT NOT NULL,
    exchange TEXT NOT NULL,
    mic_code TEXT NOT NULL,
    country TEXT,
    kind TEXT
);
CREATE TABLE IF NOT EXISTS forex_pairs (
    id INTEGER PRIMARY KEY,
    symbol TEXT NOT NULL,
    currency_group TEXT NOT NULL,
    currency_base TEXT NOT NULL,
    currency_quote TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS markets (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    code TEXT NOT NULL,
    country TEXT NOT NULL,
    timezone TEXT NOT NULL
);
"#;

/// Store over one SQLite database.
pub struct SeriesStore {
    conn: Connection,
}

impl SeriesStore {
    /// Open (or create) the database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| StoreError::Io(e.to_string()))?;
            }
        }
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// In-memory database, used by tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self { conn })
    }

    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }

    pub(crate) fn conn_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    pub fn table_exists(&self, table: &TableKey) -> Result<bool, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1")?;
        Ok(stmt.exists(params![table.table_name()])?)
    }

    /// Create the series table for a key. Forex tables carry no volume
    /// column.
    pub fn create_table(&self, table: &TableKey) -> Result<(), StoreError> {
        let volume_column = if table.key.is_equity() {
            ",\n    volume INTEGER NOT NULL"
        } else {
            ""
        };
        self.conn.execute_batch(&format!(
            r#"CREATE TABLE IF NOT EXISTS "{name}" (
    id INTEGER PRIMARY KEY,
    ts TEXT NOT NULL UNIQUE,
    open REAL NOT NULL,
    high REAL NOT NULL,
    low REAL NOT NULL,
    close REAL NOT NULL{volume_column}
)"#,
            name = table.table_name()
        ))?;
        debug!(table = %table.table_name(), "ensured series table");
        Ok(())
    }

    /// Append rows with explicit consecutive IDs starting at
    /// `starting_row_id`, all in one transaction. Rows must already be
    /// oldest-first; IDs follow the given order.
    pub fn append_rows(
        &mut self,
        table: &TableKey,
        points: &[SeriesPoint],
        starting_row_id: i64,
    ) -> Result<(), StoreError> {
        if points.is_empty() {
            return Ok(());
        }
        let name = table.table_name();
        let interval = table.interval;
        let is_equity = table.key.is_equity();
        let tx = self.conn.transaction()?;
        {
            let sql = if is_equity {
                format!(
                    r#"INSERT INTO "{name}" (id, ts, open, high, low, close, volume)
                       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"#
                )
            } else {
                format!(
                    r#"INSERT INTO "{name}" (id, ts, open, high, low, close)
                       VALUES (?1, ?2, ?3, ?4, ?5, ?6)"#
                )
            };
            let mut stmt = tx.prepare(&sql)?;
            for (offset, point) in points.iter().enumerate() {
                let id = starting_row_id + offset as i64;
                let ts = interval.format_timestamp(point.timestamp);
                if is_equity {
                    stmt.execute(params![
                        id,
                        ts,
                        point.open,
                        point.high,
                        point.low,
                        point.close,
                        point.volume.unwrap_or(0) as i64,
                    ])?;
                } else {
                    stmt.execute(params![
                        id,
                        ts,
                        point.open,
                        point.high,
                        point.low,
                        point.close,
                    ])?;
                }
            }
        }
        tx.commit()?;
        debug!(table = %name, rows = points.len(), starting_row_id, "appended rows");
        Ok(())
    }

    /// Timestamp of the highest-ID row, the resume cursor for incremental
    /// updates.
    pub fn latest_timestamp(&self, table: &TableKey) -> Result<Option<NaiveDateTime>, StoreError> {
        let name = table.table_name();
        let raw: Option<String> = self
            .conn
            .query_row(
                &format!(r#"SELECT ts FROM "{name}" ORDER BY id DESC LIMIT 1"#),
                [],
                |row| row.get(0),
            )
            .optional()?;
        raw.map(|raw| {
            table.interval.parse_timestamp(&raw).ok_or_else(|| {
                StoreError::Corrupt(format!("timestamp '{raw}' in '{name}'"))
            })
        })
        .transpose()
    }

    pub fn last_row_id(&self, table: &TableKey) -> Result<Option<i64>, StoreError> {
        let max: Option<i64> = self.conn.query_row(
            &format!(r#"SELECT MAX(id) FROM "{}""#, table.table_name()),
            [],
            |row| row.get(0),
        )?;
        Ok(max)
    }

    pub fn row_count(&self, table: &TableKey) -> Result<i64, StoreError> {
        Ok(self.conn.query_row(
            &format!(r#"SELECT COUNT(*) FROM "{}""#, table.table_name()),
            [],
            |row| row.get(0),
        )?)
    }

    /// Row ID nearest to `date` in the given direction.
    ///
    /// Forward searches ascend to the next actual trading timestamp, and
    /// backward searches descend to the previous one, so weekends and gaps
    /// resolve to real rows instead of failing. No row on the required side
    /// is a `DataNotPresent` error.
    pub fn closest_row_id(
        &self,
        table: &TableKey,
        date: NaiveDateTime,
        direction: SearchDirection,
    ) -> Result<i64, StoreError> {
        let name = table.table_name();
        let probe = table.interval.format_timestamp(date);
        let sql = match direction {
            SearchDirection::Forward => {
                format!(r#"SELECT id FROM "{name}" WHERE ts >= ?1 ORDER BY ts ASC LIMIT 1"#)
            }
            SearchDirection::Backward => {
                format!(r#"SELECT id FROM "{name}" WHERE ts <= ?1 ORDER BY ts DESC LIMIT 1"#)
            }
            SearchDirection::Exact => {
                format!(r#"SELECT id FROM "{name}" WHERE ts = ?1 LIMIT 1"#)
            }
        };
        self.conn
            .query_row(&sql, params![probe], |row| row.get(0))
            .optional()?
            .ok_or(StoreError::DataNotPresent {
                table: name,
                date,
                direction,
            })
    }

    /// The row at exactly `date`.
    pub fn point_by_date(
        &self,
        table: &TableKey,
        date: NaiveDateTime,
    ) -> Result<StoredPoint, StoreError> {
        let id = self.closest_row_id(table, date, SearchDirection::Exact)?;
        self.fetch_by_id(table, id)?
            .ok_or(StoreError::DataNotPresent {
                table: table.table_name(),
                date,
                direction: SearchDirection::Exact,
            })
    }

    pub fn fetch_by_id(
        &self,
        table: &TableKey,
        id: i64,
    ) -> Result<Option<StoredPoint>, StoreError> {
        let mut rows = self.fetch_range(table, id, id)?;
        Ok(rows.pop())
    }

    /// Rows with IDs in `[start_id, end_id]`, ascending. IDs outside the
    /// stored range simply do not match; an inverted bracket is empty.
    pub fn fetch_range(
        &self,
        table: &TableKey,
        start_id: i64,
        end_id: i64,
    ) -> Result<Vec<StoredPoint>, StoreError> {
        let name = table.table_name();
        let is_equity = table.key.is_equity();
        let volume_column = if is_equity { ", volume" } else { "" };
        let sql = format!(
            r#"SELECT id, ts, open, high, low, close{volume_column}
               FROM "{name}" WHERE id >= ?1 AND id <= ?2 ORDER BY id ASC"#
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let raw_rows = stmt
            .query_map(params![start_id, end_id], |row| {
                let volume: Option<i64> = if is_equity { row.get(6)? } else { None };
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, f64>(2)?,
                    row.get::<_, f64>(3)?,
                    row.get::<_, f64>(4)?,
                    row.get::<_, f64>(5)?,
                    volume,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        raw_rows
            .into_iter()
            .map(|(row_id, raw_ts, open, high, low, close, volume)| {
                let timestamp = table.interval.parse_timestamp(&raw_ts).ok_or_else(|| {
                    StoreError::Corrupt(format!("timestamp '{raw_ts}' in '{name}'"))
                })?;
                Ok(StoredPoint {
                    row_id,
                    point: SeriesPoint {
                        timestamp,
                        open,
                        high,
                        low,
                        close,
                        volume: volume.map(|v| v as u64),
                    },
                })
            })
            .collect()
    }

    /// Refresh the catalog entry for a series after an append. The hash
    /// fingerprints the appended batch for integrity spot checks.
    pub fn update_catalog(
        &self,
        table: &TableKey,
        appended: &[SeriesPoint],
    ) -> Result<(), StoreError> {
        let name = table.table_name();
        let (first_ts, last_ts, row_count): (Option<String>, Option<String>, i64) =
            self.conn.query_row(
                &format!(r#"SELECT MIN(ts), MAX(ts), COUNT(*) FROM "{name}""#),
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )?;
        let encoded =
            serde_json::to_vec(appended).map_err(|e| StoreError::Io(e.to_string()))?;
        let batch_hash = blake3::hash(&encoded).to_hex().to_string();
        let updated_at = chrono::Local::now()
            .naive_local()
            .format("%Y-%m-%d %H:%M:%S")
            .to_string();

        self.conn.execute(
            r#"INSERT INTO series_catalog
                   (table_name, symbol, interval, first_ts, last_ts, row_count, batch_hash, updated_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
               ON CONFLICT(table_name) DO UPDATE SET
                   first_ts = excluded.first_ts,
                   last_ts = excluded.last_ts,
                   row_count = excluded.row_count,
                   batch_hash = excluded.batch_hash,
                   updated_at = excluded.updated_at"#,
            params![
                name,
                table.key.symbol(),
                table.interval.as_str(),
                first_ts,
                last_ts,
                row_count,
                batch_hash,
                updated_at,
            ],
        )?;
        info!(table = %name, row_count, "catalog updated");
        Ok(())
    }

    /// All catalog entries, ordered by table name.
    pub fn catalog(&self) -> Result<Vec<CatalogEntry>, StoreError> {
        let mut stmt = self.conn.prepare(
            r#"SELECT table_name, symbol, interval, first_ts, last_ts, row_count, batch_hash, updated_at
               FROM series_catalog ORDER BY table_name"#,
        )?;
        let raw = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, i64>(5)?,
                    row.get::<_, String>(6)?,
                    row.get::<_, String>(7)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        raw.into_iter()
            .map(
                |(table_name, symbol, raw_interval, first, last, row_count, batch_hash, updated_at)| {
                    let interval: Interval = raw_interval
                        .parse()
                        .map_err(|_| StoreError::Corrupt(format!("interval '{raw_interval}'")))?;
                    let parse = |raw: Option<String>| -> Result<Option<NaiveDateTime>, StoreError> {
                        raw.map(|raw| {
                            interval.parse_timestamp(&raw).ok_or_else(|| {
                                StoreError::Corrupt(format!("catalog timestamp '{raw}'"))
                            })
                        })
                        .transpose()
                    };
                    Ok(CatalogEntry {
                        first_ts: parse(first)?,
                        last_ts: parse(last)?,
                        table_name,
                        symbol,
                        interval,
                        row_count,
                        batch_hash,
                        updated_at,
                    })
                },
            )
            .collect()
    }
}
