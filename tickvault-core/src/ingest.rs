//! Ingest procedures: full-history save, incremental update, and the
//! multi-series download loop.
//!
//! The save and update paths are deliberately separate entry points. Save
//! refuses a table that already holds rows (guarding against an accidental
//! full re-download), and update refuses an empty one. Update re-derives
//! its cursor from the stored latest timestamp, so a crash between
//! page-batch transactions resumes cleanly.

use chrono::NaiveDateTime;
use thiserror::Error;
use tracing::{info, warn};

use crate::auth::{Clock, KeyRotator};
use crate::config::ConfigError;
use crate::domain::TableKey;
use crate::provider::{backfill, BackfillRequest, MarketDataSource, ProviderError};
use crate::store::{SeriesStore, StoreError};

/// Umbrella error for ingest procedures.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Download a series' history and store it from row 0.
///
/// Creates the table when missing. A table that already holds rows is
/// refused; switch to [`update_history`] for that.
pub fn save_full_history<S, C>(
    store: &mut SeriesStore,
    source: &S,
    rotator: &mut KeyRotator<C>,
    table: &TableKey,
    start_date: Option<NaiveDateTime>,
    end_date: Option<NaiveDateTime>,
) -> Result<usize, IngestError>
where
    S: MarketDataSource + ?Sized,
    C: Clock,
{
    if !store.table_exists(table)? {
        store.create_table(table)?;
    }
    let existing = store.row_count(table)?;
    if existing > 0 {
        return Err(StoreError::AlreadyInitialized {
            table: table.table_name(),
            rows: existing,
        }
        .into());
    }

    let request = BackfillRequest {
        key: table.key.clone(),
        interval: table.interval,
        start_date,
        end_date,
    };
    let series = backfill(source, rotator, &request)?;
    store.append_rows(table, &series, 0)?;
    store.update_catalog(table, &series)?;
    info!(table = %table.table_name(), rows = series.len(), "saved full history");
    Ok(series.len())
}

/// Extend a stored series up to the present.
///
/// The cursor comes from the stored latest timestamp. The provider's
/// inclusive start re-serves the boundary row, which is dropped before
/// appending, so row IDs stay dense.
pub fn update_history<S, C>(
    store: &mut SeriesStore,
    source: &S,
    rotator: &mut KeyRotator<C>,
    table: &TableKey,
) -> Result<usize, IngestError>
where
    S: MarketDataSource + ?Sized,
    C: Clock,
{
    if !store.table_exists(table)? {
        return Err(StoreError::TableMissing(table.table_name()).into());
    }
    let latest = store
        .latest_timestamp(table)?
        .ok_or_else(|| StoreError::EmptySeries(table.table_name()))?;

    let request = BackfillRequest {
        key: table.key.clone(),
        interval: table.interval,
        start_date: Some(latest),
        end_date: None,
    };
    let series = backfill(source, rotator, &request)?;
    let fresh: Vec<_> = series
        .into_iter()
        .skip_while(|p| p.timestamp <= latest)
        .collect();
    if fresh.is_empty() {
        info!(table = %table.table_name(), "already up to date");
        return Ok(0);
    }

    let next_id = store.last_row_id(table)?.map_or(0, |id| id + 1);
    store.append_rows(table, &fresh, next_id)?;
    store.update_catalog(table, &fresh)?;
    info!(table = %table.table_name(), rows = fresh.len(), "extended history");
    Ok(fresh.len())
}

/// Outcome of a multi-series download.
#[derive(Debug)]
pub struct IngestSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub rows: usize,
    pub errors: Vec<(String, IngestError)>,
}

impl IngestSummary {
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }
}

/// Download several series in sequence, choosing save or update per table
/// by whether it already holds rows. One failing series does not stop the
/// rest.
///
/// Callers that want cross-series parallelism run one of these loops per
/// worker, each with a rotator over a disjoint credential subset.
pub fn download_many<S, C>(
    store: &mut SeriesStore,
    source: &S,
    rotator: &mut KeyRotator<C>,
    tables: &[TableKey],
) -> IngestSummary
where
    S: MarketDataSource + ?Sized,
    C: Clock,
{
    let total = tables.len();
    let mut succeeded = 0;
    let mut failed = 0;
    let mut rows = 0;
    let mut errors: Vec<(String, IngestError)> = Vec::new();

    for table in tables {
        let has_rows = match store.table_exists(table) {
            Ok(true) => match store.row_count(table) {
                Ok(count) => count > 0,
                Err(e) => {
                    warn!(table = %table.table_name(), error = %e, "row count failed");
                    errors.push((table.table_name(), e.into()));
                    failed += 1;
                    continue;
                }
            },
            Ok(false) => false,
            Err(e) => {
                errors.push((table.table_name(), e.into()));
                failed += 1;
                continue;
            }
        };

        let result = if has_rows {
            update_history(store, source, rotator, table)
        } else {
            save_full_history(store, source, rotator, table, None, None)
        };
        match result {
            Ok(appended) => {
                succeeded += 1;
                rows += appended;
            }
            Err(e) => {
                warn!(table = %table.table_name(), error = %e, "series download failed");
                errors.push((table.table_name(), e));
                failed += 1;
            }
        }
    }

    IngestSummary {
        total,
        succeeded,
        failed,
        rows,
        errors,
    }
}
