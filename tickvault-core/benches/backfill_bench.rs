//! Benchmarks for page stitching and bracket resolution.

use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

use tickvault_core::auth::{ApiTier, Credential, CredentialPool, KeyRotator, SystemClock};
use tickvault_core::domain::{Interval, SeriesKey, SeriesPoint, TableKey};
use tickvault_core::provider::{
    backfill, BackfillRequest, MarketDataSource, PageQuery, ProviderError, MAX_PAGE_ROWS,
};
use tickvault_core::store::{resolve_bracket, BracketRequest, SeriesStore};

struct InMemorySource {
    history: Vec<SeriesPoint>,
}

impl MarketDataSource for InMemorySource {
    fn earliest_timestamp(
        &self,
        _key: &SeriesKey,
        _interval: Interval,
        _credential: &Credential,
    ) -> Result<NaiveDateTime, ProviderError> {
        Ok(self.history[0].timestamp)
    }

    fn fetch_page(
        &self,
        query: &PageQuery,
        _credential: &Credential,
    ) -> Result<Vec<SeriesPoint>, ProviderError> {
        Ok(self
            .history
            .iter()
            .filter(|p| {
                query.start_date.map_or(true, |s| p.timestamp >= s)
                    && query.end_date.map_or(true, |e| p.timestamp <= e)
            })
            .rev()
            .take(MAX_PAGE_ROWS)
            .cloned()
            .collect())
    }
}

/// Continuous forex-style minutes, closed on weekends like the real market.
fn synthetic_minutes(n: usize) -> Vec<SeriesPoint> {
    use chrono::Datelike;
    let start = NaiveDate::from_ymd_opt(2022, 1, 3) // a Monday
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    let mut points = Vec::with_capacity(n);
    let mut cursor = start;
    while points.len() < n {
        if cursor.weekday().number_from_monday() <= 5 {
            let base = 10.0 + (points.len() % 97) as f64 * 0.01;
            points.push(SeriesPoint {
                timestamp: cursor,
                open: base,
                high: base + 0.05,
                low: base - 0.05,
                close: base + 0.01,
                volume: None,
            });
        }
        cursor += chrono::Duration::minutes(1);
    }
    points
}

fn bench_backfill_stitch(c: &mut Criterion) {
    let source = InMemorySource {
        history: synthetic_minutes(30_000),
    };
    let pool = CredentialPool::new(vec![Credential::new("key0", ApiTier::Direct, "tok")]).unwrap();
    let request = BackfillRequest {
        key: SeriesKey::parse("USD/EUR", None).unwrap(),
        interval: Interval::Min1,
        start_date: Some(source.history[0].timestamp),
        end_date: Some(source.history.last().unwrap().timestamp),
    };

    c.bench_function("backfill_stitch_30k", |b| {
        b.iter(|| {
            let mut rotator =
                KeyRotator::with_clock(&pool, None, Duration::ZERO, SystemClock).unwrap();
            let series = backfill(&source, &mut rotator, black_box(&request)).unwrap();
            black_box(series.len())
        })
    });
}

fn bench_bracket_resolution(c: &mut Criterion) {
    let mut store = SeriesStore::open_in_memory().unwrap();
    let table = TableKey::new(SeriesKey::parse("USD/EUR", None).unwrap(), Interval::Min1);
    store.create_table(&table).unwrap();
    let history = synthetic_minutes(50_000);
    store.append_rows(&table, &history, 0).unwrap();

    let request = BracketRequest::between(history[1_000].timestamp, history[45_000].timestamp);

    c.bench_function("resolve_bracket_50k", |b| {
        b.iter(|| {
            let bracket = resolve_bracket(&store, &table, black_box(&request)).unwrap();
            black_box(bracket)
        })
    });
}

criterion_group!(benches, bench_backfill_stitch, bench_bracket_resolution);
criterion_main!(benches);
