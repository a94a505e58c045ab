//! Synthetic series generators shared across test modules.

use chrono::{Datelike, Days, NaiveDateTime};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::domain::SeriesPoint;

/// `n` consecutive one-minute observations starting at `start`, oldest
/// first. Prices wander deterministically; volume appears only when asked.
pub fn minute_series(start: NaiveDateTime, n: usize, with_volume: bool) -> Vec<SeriesPoint> {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    (0..n)
        .map(|i| {
            let timestamp = start + chrono::Duration::minutes(i as i64);
            point_at(timestamp, &mut rng, with_volume)
        })
        .collect()
}

/// `n` daily observations starting at `start`, skipping Saturdays and
/// Sundays the way an exchange calendar does. Oldest first.
pub fn weekday_daily_series(
    start: NaiveDateTime,
    n: usize,
    with_volume: bool,
) -> Vec<SeriesPoint> {
    let mut rng = StdRng::seed_from_u64(0xda7e);
    let mut cursor = start;
    while cursor.weekday().number_from_monday() > 5 {
        cursor = cursor.checked_add_days(Days::new(1)).expect("in range");
    }
    let mut points = Vec::with_capacity(n);
    while points.len() < n {
        if cursor.weekday().number_from_monday() <= 5 {
            points.push(point_at(cursor, &mut rng, with_volume));
        }
        cursor = cursor.checked_add_days(Days::new(1)).expect("in range");
    }
    points
}

fn point_at(timestamp: NaiveDateTime, rng: &mut StdRng, with_volume: bool) -> SeriesPoint {
    // Sorted draw gives low <= open/close <= high for free.
    let mut draws: Vec<f64> = (0..4).map(|_| rng.gen_range(4.0..26.0)).collect();
    draws.sort_by(|a, b| a.partial_cmp(b).expect("finite"));
    let bullish = rng.gen_bool(0.5);
    let (open, close) = if bullish {
        (draws[1], draws[2])
    } else {
        (draws[2], draws[1])
    };
    SeriesPoint {
        timestamp,
        open,
        high: draws[3],
        low: draws[0],
        close,
        volume: with_volume.then(|| rng.gen_range(100..300)),
    }
}
