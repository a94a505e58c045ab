//! Relational persistence: row-identified series tables, the bracket
//! resolver, the series catalog, and reference data.

pub mod bracket;
pub mod reference;
pub mod series;

use std::fmt;

use chrono::NaiveDateTime;
use thiserror::Error;

pub use bracket::{fetch_by_dates, resolve_bracket, BracketRequest, RowBracket};
pub use reference::{ForexPairFilter, ForexPairRow, MarketFilter, MarketRow, StockFilter, StockRow};
pub use series::{CatalogEntry, SearchDirection, SeriesStore};

/// Errors crossing the storage boundary.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("i/o error: {0}")]
    Io(String),

    #[error("no series table '{0}'; save its history first")]
    TableMissing(String),

    #[error("series '{0}' has no rows yet; save its history first")]
    EmptySeries(String),

    #[error("series '{table}' already holds {rows} rows; use the update path instead")]
    AlreadyInitialized { table: String, rows: i64 },

    #[error("no datapoint {direction} {date} in '{table}'")]
    DataNotPresent {
        table: String,
        date: NaiveDateTime,
        direction: SearchDirection,
    },

    #[error("a bracket needs two of: start date, end date, and one span; got fewer")]
    UnderdeterminedBracket,

    #[error("row span must be at least 1, got {0}")]
    InvalidRowSpan(i64),

    #[error("an empty filter pattern matches nothing; omit the filter instead")]
    EmptyFilter,

    #[error("corrupt stored value: {0}")]
    Corrupt(String),
}

impl fmt::Display for SearchDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SearchDirection::Forward => "at or after",
            SearchDirection::Backward => "at or before",
            SearchDirection::Exact => "at",
        })
    }
}
