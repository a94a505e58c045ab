//! Series point — the fundamental observation unit.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One OHLC(V) observation.
///
/// Timestamps are local exchange time: second precision for intraday series,
/// midnight for daily bars. Volume is present for equities and absent for
/// forex pairs. Within one series timestamps are strictly increasing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: Option<u64>,
}

impl SeriesPoint {
    /// Basic OHLC sanity check: the high bounds everything from above and
    /// the low from below.
    pub fn is_sane(&self) -> bool {
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
    }
}

/// A series point as read back from storage, carrying its row ID.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredPoint {
    pub row_id: i64,
    pub point: SeriesPoint,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn sanity_check() {
        let point = SeriesPoint {
            timestamp: NaiveDate::from_ymd_opt(2024, 1, 2)
                .unwrap()
                .and_hms_opt(9, 30, 0)
                .unwrap(),
            open: 100.0,
            high: 105.0,
            low: 98.0,
            close: 103.0,
            volume: Some(50_000),
        };
        assert!(point.is_sane());

        let inverted = SeriesPoint {
            high: 90.0,
            ..point
        };
        assert!(!inverted.is_sane());
    }
}
