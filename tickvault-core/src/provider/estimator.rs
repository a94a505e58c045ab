//! Sizing the pagination loop.
//!
//! The loop bound only has to be an upper bound: the backfill engine stops
//! early on a short page, but an underestimate would silently truncate
//! history. So the estimate deliberately overshoots.

use chrono::NaiveDateTime;

use crate::domain::Interval;
use crate::provider::request::MAX_PAGE_ROWS;

/// A bit more than the 5-of-7 trading-day share of a calendar week.
const TRADING_DAY_DENSITY: f64 = 0.76;

/// Number of paginated requests needed to cover the span from the first
/// historical point to `end`. Always at least 1.
pub fn estimate_iterations(
    first_point: NaiveDateTime,
    end: NaiveDateTime,
    interval: Interval,
    is_equity: bool,
) -> u32 {
    let calendar_days = (end - first_point).num_days() + 1;
    let trading_days = calendar_days as f64 * TRADING_DAY_DENSITY;
    let expected_points = trading_days * interval.points_per_day(is_equity) as f64;
    // Negative spans floor to zero at the cast; the +1 margin keeps the
    // contract of at least one request.
    (expected_points / MAX_PAGE_ROWS as f64).ceil() as u32 + 1
}
