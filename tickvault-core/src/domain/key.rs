//! Series identity — which instrument, on which venue, at which granularity.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::domain::Interval;

/// Default listing venue assumed for an equity when no MIC is supplied.
pub const DEFAULT_MIC: &str = "XNGS";

/// What a series identifies: an equity on a specific venue, or a forex pair.
///
/// The same ticker can list on multiple venues, so equities carry a MIC.
/// Forex pairs carry none and report no volume.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SeriesKey {
    Equity { symbol: String, mic: String },
    Forex { base: String, quote: String },
}

impl SeriesKey {
    pub fn equity(symbol: &str, mic: &str) -> Result<Self, ConfigError> {
        validate_part(symbol)?;
        validate_part(mic)?;
        Ok(SeriesKey::Equity {
            symbol: symbol.to_string(),
            mic: mic.to_string(),
        })
    }

    pub fn forex(base: &str, quote: &str) -> Result<Self, ConfigError> {
        validate_part(base)?;
        validate_part(quote)?;
        Ok(SeriesKey::Forex {
            base: base.to_string(),
            quote: quote.to_string(),
        })
    }

    /// Parse a user-supplied symbol. A `/` marks a currency pair; anything
    /// else is an equity on `mic` (default venue when unspecified).
    pub fn parse(symbol: &str, mic: Option<&str>) -> Result<Self, ConfigError> {
        match symbol.split_once('/') {
            Some((base, quote)) => Self::forex(base, quote),
            None => Self::equity(symbol, mic.unwrap_or(DEFAULT_MIC)),
        }
    }

    pub fn is_equity(&self) -> bool {
        matches!(self, SeriesKey::Equity { .. })
    }

    /// The provider-facing symbol: `AAPL` or `USD/EUR`.
    pub fn symbol(&self) -> String {
        match self {
            SeriesKey::Equity { symbol, .. } => symbol.clone(),
            SeriesKey::Forex { base, quote } => format!("{base}/{quote}"),
        }
    }
}

impl fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeriesKey::Equity { symbol, mic } => write!(f, "{symbol}_{mic}"),
            SeriesKey::Forex { base, quote } => write!(f, "{base}/{quote}"),
        }
    }
}

/// A series key pinned to a granularity — the unit the store partitions by.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableKey {
    pub key: SeriesKey,
    pub interval: Interval,
}

impl TableKey {
    pub fn new(key: SeriesKey, interval: Interval) -> Self {
        Self { key, interval }
    }

    /// Storage table identifier: `AAPL_XNGS_1min` / `USD_EUR_1day`.
    ///
    /// Parts are validated at key construction, so the identifier is safe to
    /// splice into quoted SQL.
    pub fn table_name(&self) -> String {
        match &self.key {
            SeriesKey::Equity { symbol, mic } => {
                format!("{symbol}_{mic}_{}", self.interval)
            }
            SeriesKey::Forex { base, quote } => {
                format!("{base}_{quote}_{}", self.interval)
            }
        }
    }
}

impl fmt::Display for TableKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.table_name())
    }
}

fn validate_part(part: &str) -> Result<(), ConfigError> {
    let ok = !part.is_empty()
        && part
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-');
    if ok {
        Ok(())
    } else {
        Err(ConfigError::InvalidSymbol(part.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_equity_defaults_venue() {
        let key = SeriesKey::parse("NVDA", None).unwrap();
        assert_eq!(
            key,
            SeriesKey::Equity {
                symbol: "NVDA".into(),
                mic: "XNGS".into()
            }
        );
        assert!(key.is_equity());
        assert_eq!(key.symbol(), "NVDA");
    }

    #[test]
    fn parse_forex_by_slash() {
        let key = SeriesKey::parse("USD/EUR", None).unwrap();
        assert!(!key.is_equity());
        assert_eq!(key.symbol(), "USD/EUR");
    }

    #[test]
    fn rejects_sql_hostile_symbols() {
        assert!(SeriesKey::parse("AAPL\"; drop", None).is_err());
        assert!(SeriesKey::parse("", None).is_err());
        assert!(SeriesKey::parse("USD/", None).is_err());
    }

    #[test]
    fn table_names() {
        let eq = TableKey::new(SeriesKey::parse("AAPL", None).unwrap(), Interval::Min1);
        assert_eq!(eq.table_name(), "AAPL_XNGS_1min");
        let fx = TableKey::new(SeriesKey::parse("USD/EUR", None).unwrap(), Interval::Day1);
        assert_eq!(fx.table_name(), "USD_EUR_1day");
    }
}
