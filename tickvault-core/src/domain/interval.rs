//! Sampling intervals and their density profiles.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// Sampling granularity of a series. The provider supports exactly two, and
/// each carries its own timestamp wire format and per-day density model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interval {
    #[serde(rename = "1min")]
    Min1,
    #[serde(rename = "1day")]
    Day1,
}

impl Interval {
    /// Wire name used in API parameters and table identifiers.
    pub fn as_str(self) -> &'static str {
        match self {
            Interval::Min1 => "1min",
            Interval::Day1 => "1day",
        }
    }

    /// Timestamp format the provider serves for this interval.
    pub fn timestamp_format(self) -> &'static str {
        match self {
            Interval::Min1 => "%Y-%m-%d %H:%M:%S",
            Interval::Day1 => "%Y-%m-%d",
        }
    }

    /// Expected datapoints per trading day.
    ///
    /// Equities trade a ~6.5h session (390 one-minute bars); forex trades
    /// near-continuously (1440); daily bars are one per day either way.
    pub fn points_per_day(self, is_equity: bool) -> u32 {
        match (self, is_equity) {
            (Interval::Min1, true) => 390,
            (Interval::Min1, false) => 1440,
            (Interval::Day1, _) => 1,
        }
    }

    pub fn is_intraday(self) -> bool {
        matches!(self, Interval::Min1)
    }

    /// Render a timestamp in this interval's wire format.
    ///
    /// The rendered strings order lexicographically the same way the
    /// underlying timestamps order, which the store's range queries rely on.
    pub fn format_timestamp(self, ts: NaiveDateTime) -> String {
        ts.format(self.timestamp_format()).to_string()
    }

    /// Parse a timestamp in this interval's wire format. Daily timestamps
    /// land on midnight.
    pub fn parse_timestamp(self, raw: &str) -> Option<NaiveDateTime> {
        match self {
            Interval::Min1 => NaiveDateTime::parse_from_str(raw, self.timestamp_format()).ok(),
            Interval::Day1 => NaiveDate::parse_from_str(raw, self.timestamp_format())
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0)),
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interval {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1min" => Ok(Interval::Min1),
            "1day" => Ok(Interval::Day1),
            other => Err(ConfigError::InvalidInterval(other.to_string())),
        }
    }
}
