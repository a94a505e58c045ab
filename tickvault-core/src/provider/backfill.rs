//! The backfill engine: paginated download, stitch, and resume support.
//!
//! Pages are causally dependent — each page's cursor is the previous page's
//! oldest timestamp — so the loop is strictly serial, and the rotator's
//! throttling is the only waiting that happens. A malformed page aborts the
//! whole run; partial series are never returned.

use chrono::NaiveDateTime;
use tracing::{debug, info};

use crate::auth::{Clock, Credential, KeyRotator};
use crate::domain::{session, Interval, SeriesKey, SeriesPoint};
use crate::provider::estimator::estimate_iterations;
use crate::provider::request::{PageQuery, MAX_PAGE_ROWS};
use crate::provider::ProviderError;

/// Anything that can serve the two upstream calls the engine needs. The
/// HTTP client implements this; tests substitute a scripted source.
pub trait MarketDataSource {
    /// The oldest timestamp the provider holds for this series.
    fn earliest_timestamp(
        &self,
        key: &SeriesKey,
        interval: Interval,
        credential: &Credential,
    ) -> Result<NaiveDateTime, ProviderError>;

    /// One page of observations, newest first, bounded by the query dates.
    fn fetch_page(
        &self,
        query: &PageQuery,
        credential: &Credential,
    ) -> Result<Vec<SeriesPoint>, ProviderError>;
}

/// What to download: a series and an optional date bracket. Missing ends
/// default to the edges of available history.
#[derive(Debug, Clone)]
pub struct BackfillRequest {
    pub key: SeriesKey,
    pub interval: Interval,
    pub start_date: Option<NaiveDateTime>,
    pub end_date: Option<NaiveDateTime>,
}

impl BackfillRequest {
    pub fn full_history(key: SeriesKey, interval: Interval) -> Self {
        Self {
            key,
            interval,
            start_date: None,
            end_date: None,
        }
    }
}

/// Download the requested span as one gapless series, oldest first.
///
/// Pagination walks backwards in time: each page ends at the cursor, which
/// then advances to the page's oldest row. Page joins overlap by exactly one
/// row (the inclusive cursor), dropped during stitching. The loop stops on
/// reaching the earliest known timestamp or on a short page.
pub fn backfill<S, C>(
    source: &S,
    rotator: &mut KeyRotator<C>,
    request: &BackfillRequest,
) -> Result<Vec<SeriesPoint>, ProviderError>
where
    S: MarketDataSource + ?Sized,
    C: Clock,
{
    let mut start_date = request.start_date;
    let mut end_date = request.end_date;
    if request.interval.is_intraday() && request.key.is_equity() {
        start_date = start_date.map(session::clamp_start);
        end_date = end_date.map(session::clamp_end);
    }

    // The pagination target: either the caller's start or the true start of
    // history, probed with one rotated credential.
    let first_point = match start_date {
        Some(ts) => ts,
        None => source.earliest_timestamp(&request.key, request.interval, rotator.next())?,
    };

    let horizon = end_date.unwrap_or_else(|| chrono::Local::now().naive_local());
    let iterations =
        estimate_iterations(first_point, horizon, request.interval, request.key.is_equity());
    debug!(
        series = %request.key.symbol(),
        interval = %request.interval,
        iterations,
        "sized backfill loop"
    );

    let mut query = PageQuery::new(request.key.clone(), request.interval);
    query.start_date = start_date;
    query.end_date = end_date;

    let mut series: Vec<SeriesPoint> = Vec::new();
    for page_index in 0..iterations {
        let page = source.fetch_page(&query, rotator.next())?;
        let Some(newest) = page.first() else {
            return Err(ProviderError::MalformedResponse(format!(
                "empty page for {}",
                request.key.symbol()
            )));
        };

        if page_index == 0 {
            // Seed the assembly with the newest boundary row; every page
            // after the seed re-serves its own first row at the join.
            series.push(newest.clone());
        }
        let page_len = page.len();
        let cursor = page[page_len - 1].timestamp;
        series.extend(page.into_iter().skip(1));
        debug!(
            page = page_index + 1,
            rows = page_len,
            cursor = %cursor,
            "stitched page"
        );

        if cursor == first_point || page_len < MAX_PAGE_ROWS {
            break;
        }
        query.end_date = Some(cursor);
    }

    // Pages arrive newest-first, so the assembly is too.
    series.reverse();
    verify_strictly_increasing(&request.key, &series)?;
    info!(
        series = %request.key.symbol(),
        rows = series.len(),
        "backfill assembled"
    );
    Ok(series)
}

fn verify_strictly_increasing(
    key: &SeriesKey,
    series: &[SeriesPoint],
) -> Result<(), ProviderError> {
    for pair in series.windows(2) {
        if pair[1].timestamp <= pair[0].timestamp {
            return Err(ProviderError::MalformedResponse(format!(
                "series for {} is not strictly increasing at {}",
                key.symbol(),
                pair[1].timestamp
            )));
        }
    }
    Ok(())
}
