//! Reference data: listed stocks, currency pairs, and markets.
//!
//! Snapshots of the provider's reference lists, persisted with dense IDs
//! and queried through SQL LIKE patterns. A `None` filter means
//! "unfiltered"; an explicitly empty pattern is an error, because LIKE ''
//! silently matches nothing and that is never what the caller meant.

use rusqlite::params_from_iter;
use tracing::info;

use crate::provider::{ExchangeRecord, ForexPairRecord, StockRecord};
use crate::store::series::SeriesStore;
use crate::store::StoreError;

/// A stored stock listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockRow {
    pub id: i64,
    pub symbol: String,
    pub name: String,
    pub currency: String,
    pub exchange: String,
    pub mic_code: String,
    pub country: Option<String>,
    pub kind: Option<String>,
}

/// A stored currency-pair listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForexPairRow {
    pub id: i64,
    pub symbol: String,
    pub currency_group: String,
    pub currency_base: String,
    pub currency_quote: String,
}

/// A stored market/exchange listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketRow {
    pub id: i64,
    pub name: String,
    pub code: String,
    pub country: String,
    pub timezone: String,
}

/// LIKE filters for stock lookups.
#[derive(Debug, Clone, Copy, Default)]
pub struct StockFilter<'a> {
    pub symbol: Option<&'a str>,
    pub name: Option<&'a str>,
    pub currency: Option<&'a str>,
    pub mic_code: Option<&'a str>,
}

/// LIKE filters for currency-pair lookups.
#[derive(Debug, Clone, Copy, Default)]
pub struct ForexPairFilter<'a> {
    pub currency_group: Option<&'a str>,
    pub symbol: Option<&'a str>,
    pub currency_base: Option<&'a str>,
    pub currency_quote: Option<&'a str>,
}

/// LIKE filters for market lookups.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarketFilter<'a> {
    pub name: Option<&'a str>,
    pub code: Option<&'a str>,
    pub country: Option<&'a str>,
    pub timezone: Option<&'a str>,
}

impl SeriesStore {
    /// Replace the stored stock list with a fresh provider snapshot.
    pub fn replace_stocks(&mut self, records: &[StockRecord]) -> Result<usize, StoreError> {
        let tx = self.conn_mut().transaction()?;
        tx.execute("DELETE FROM stocks", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO stocks (id, symbol, name, currency, exchange, mic_code, country, kind)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;
            for (id, record) in records.iter().enumerate() {
                stmt.execute(rusqlite::params![
                    id as i64,
                    record.symbol,
                    record.name,
                    record.currency,
                    record.exchange,
                    record.mic_code,
                    record.country,
                    record.kind,
                ])?;
            }
        }
        tx.commit()?;
        info!(rows = records.len(), "replaced stock reference list");
        Ok(records.len())
    }

    /// Replace the stored currency-pair list with a fresh snapshot.
    pub fn replace_forex_pairs(
        &mut self,
        records: &[ForexPairRecord],
    ) -> Result<usize, StoreError> {
        let tx = self.conn_mut().transaction()?;
        tx.execute("DELETE FROM forex_pairs", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO forex_pairs (id, symbol, currency_group, currency_base, currency_quote)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for (id, record) in records.iter().enumerate() {
                stmt.execute(rusqlite::params![
                    id as i64,
                    record.symbol,
                    record.currency_group,
                    record.currency_base,
                    record.currency_quote,
                ])?;
            }
        }
        tx.commit()?;
        info!(rows = records.len(), "replaced forex-pair reference list");
        Ok(records.len())
    }

    /// Replace the stored market list with a fresh snapshot.
    pub fn replace_markets(&mut self, records: &[ExchangeRecord]) -> Result<usize, StoreError> {
        let tx = self.conn_mut().transaction()?;
        tx.execute("DELETE FROM markets", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO markets (id, name, code, country, timezone)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for (id, record) in records.iter().enumerate() {
                stmt.execute(rusqlite::params![
                    id as i64,
                    record.name,
                    record.code,
                    record.country,
                    record.timezone,
                ])?;
            }
        }
        tx.commit()?;
        info!(rows = records.len(), "replaced market reference list");
        Ok(records.len())
    }

    pub fn fetch_stocks(&self, filter: StockFilter<'_>) -> Result<Vec<StockRow>, StoreError> {
        let mut clauses = Vec::new();
        let mut args: Vec<String> = Vec::new();
        push_filter(&mut clauses, &mut args, "symbol", filter.symbol)?;
        push_filter(&mut clauses, &mut args, "name", filter.name)?;
        push_filter(&mut clauses, &mut args, "currency", filter.currency)?;
        push_filter(&mut clauses, &mut args, "mic_code", filter.mic_code)?;

        let sql = format!(
            "SELECT id, symbol, name, currency, exchange, mic_code, country, kind
             FROM stocks{} ORDER BY id",
            where_clause(&clauses)
        );
        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(args), |row| {
                Ok(StockRow {
                    id: row.get(0)?,
                    symbol: row.get(1)?,
                    name: row.get(2)?,
                    currency: row.get(3)?,
                    exchange: row.get(4)?,
                    mic_code: row.get(5)?,
                    country: row.get(6)?,
                    kind: row.get(7)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn fetch_forex_pairs(
        &self,
        filter: ForexPairFilter<'_>,
    ) -> Result<Vec<ForexPairRow>, StoreError> {
        let mut clauses = Vec::new();
        let mut args: Vec<String> = Vec::new();
        push_filter(&mut clauses, &mut args, "currency_group", filter.currency_group)?;
        push_filter(&mut clauses, &mut args, "symbol", filter.symbol)?;
        push_filter(&mut clauses, &mut args, "currency_base", filter.currency_base)?;
        push_filter(&mut clauses, &mut args, "currency_quote", filter.currency_quote)?;

        let sql = format!(
            "SELECT id, symbol, currency_group, currency_base, currency_quote
             FROM forex_pairs{} ORDER BY id",
            where_clause(&clauses)
        );
        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(args), |row| {
                Ok(ForexPairRow {
                    id: row.get(0)?,
                    symbol: row.get(1)?,
                    currency_group: row.get(2)?,
                    currency_base: row.get(3)?,
                    currency_quote: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn fetch_markets(&self, filter: MarketFilter<'_>) -> Result<Vec<MarketRow>, StoreError> {
        let mut clauses = Vec::new();
        let mut args: Vec<String> = Vec::new();
        push_filter(&mut clauses, &mut args, "name", filter.name)?;
        push_filter(&mut clauses, &mut args, "code", filter.code)?;
        push_filter(&mut clauses, &mut args, "country", filter.country)?;
        push_filter(&mut clauses, &mut args, "timezone", filter.timezone)?;

        let sql = format!(
            "SELECT id, name, code, country, timezone FROM markets{} ORDER BY id",
            where_clause(&clauses)
        );
        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(args), |row| {
                Ok(MarketRow {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    code: row.get(2)?,
                    country: row.get(3)?,
                    timezone: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

fn push_filter(
    clauses: &mut Vec<String>,
    args: &mut Vec<String>,
    column: &str,
    pattern: Option<&str>,
) -> Result<(), StoreError> {
    if let Some(pattern) = pattern {
        if pattern.is_empty() {
            return Err(StoreError::EmptyFilter);
        }
        args.push(pattern.to_string());
        clauses.push(format!("{column} LIKE ?{}", args.len()));
    }
    Ok(())
}

fn where_clause(clauses: &[String]) -> String {
    if clauses.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", clauses.join(" AND "))
    }
}
