//! Date-constraint to row-ID bracket resolution.
//!
//! Callers describe a slice of a stored series with any two of: start date,
//! end date, an absolute duration, or a row count. Resolution turns that
//! into an inclusive [start_id, end_id] bracket. Exact date pairs are
//! strict: a bracket entirely outside stored history fails. Span-anchored
//! requests are lenient: a too-generous count clamps to what exists, since
//! the caller asked for "about N points near this date" and an off guess on
//! the date should not be punished.

use chrono::{Duration, NaiveDateTime};

use crate::domain::{StoredPoint, TableKey};
use crate::store::series::{SearchDirection, SeriesStore};
use crate::store::StoreError;

/// A desired sub-range of a stored series. Exactly enough of the four
/// fields must be set to determine both ends; `time_span` and `row_span`
/// are alternatives for "the other end" and `time_span` wins when both are
/// present.
#[derive(Debug, Clone, Default)]
pub struct BracketRequest {
    pub start_date: Option<NaiveDateTime>,
    pub end_date: Option<NaiveDateTime>,
    pub time_span: Option<Duration>,
    pub row_span: Option<i64>,
}

impl BracketRequest {
    pub fn between(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self {
            start_date: Some(start),
            end_date: Some(end),
            ..Self::default()
        }
    }

    pub fn from_start(start: NaiveDateTime, row_span: i64) -> Self {
        Self {
            start_date: Some(start),
            row_span: Some(row_span),
            ..Self::default()
        }
    }

    pub fn until_end(end: NaiveDateTime, row_span: i64) -> Self {
        Self {
            end_date: Some(end),
            row_span: Some(row_span),
            ..Self::default()
        }
    }
}

/// An inclusive row-ID range identifying a contiguous slice of a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowBracket {
    pub start_id: i64,
    pub end_id: i64,
}

/// Resolve a bracket request against a stored series.
///
/// Start boundaries search forward (nearest row at or after the date), end
/// boundaries backward, so weekends and gaps land on real trading rows.
/// Validation happens before any lookup.
pub fn resolve_bracket(
    store: &SeriesStore,
    table: &TableKey,
    request: &BracketRequest,
) -> Result<RowBracket, StoreError> {
    if let Some(rows) = request.row_span {
        if rows < 1 {
            return Err(StoreError::InvalidRowSpan(rows));
        }
    }

    match (
        request.start_date,
        request.end_date,
        request.time_span,
        request.row_span,
    ) {
        (Some(start), Some(end), _, _) => resolve_dates(store, table, start, end),
        (Some(start), None, Some(span), _) => resolve_dates(store, table, start, start + span),
        (None, Some(end), Some(span), _) => resolve_dates(store, table, end - span, end),
        (Some(start), None, None, Some(rows)) => {
            let start_id = store.closest_row_id(table, start, SearchDirection::Forward)?;
            let last_id = store.last_row_id(table)?.unwrap_or(start_id);
            Ok(RowBracket {
                start_id,
                end_id: (start_id + rows - 1).min(last_id),
            })
        }
        (None, Some(end), None, Some(rows)) => {
            let end_id = store.closest_row_id(table, end, SearchDirection::Backward)?;
            Ok(RowBracket {
                start_id: (end_id - rows + 1).max(0),
                end_id,
            })
        }
        _ => Err(StoreError::UnderdeterminedBracket),
    }
}

fn resolve_dates(
    store: &SeriesStore,
    table: &TableKey,
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> Result<RowBracket, StoreError> {
    let start_id = store.closest_row_id(table, start, SearchDirection::Forward)?;
    let end_id = store.closest_row_id(table, end, SearchDirection::Backward)?;
    Ok(RowBracket { start_id, end_id })
}

/// Resolve and read in one step, in the forgiving mode chart callers want:
/// a bracket that falls entirely outside stored history yields an empty
/// vector rather than an error.
pub fn fetch_by_dates(
    store: &SeriesStore,
    table: &TableKey,
    request: &BracketRequest,
) -> Result<Vec<StoredPoint>, StoreError> {
    match resolve_bracket(store, table, request) {
        Ok(bracket) => store.fetch_range(table, bracket.start_id, bracket.end_id),
        Err(StoreError::DataNotPresent { .. }) => Ok(Vec::new()),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Interval, SeriesKey};
    use crate::testutil::weekday_daily_series;
    use chrono::NaiveDate;

    /// A daily forex table with 25 weekday rows, IDs 0..=24.
    fn seeded_store() -> (SeriesStore, TableKey, Vec<crate::domain::SeriesPoint>) {
        let mut store = SeriesStore::open_in_memory().unwrap();
        let table = TableKey::new(SeriesKey::parse("USD/EUR", None).unwrap(), Interval::Day1);
        store.create_table(&table).unwrap();
        // 2022-03-07 was a Monday.
        let start = NaiveDate::from_ymd_opt(2022, 3, 7)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let points = weekday_daily_series(start, 25, false);
        store.append_rows(&table, &points, 0).unwrap();
        (store, table, points)
    }

    #[test]
    fn underdetermined_requests_fail_before_lookup() {
        let store = SeriesStore::open_in_memory().unwrap();
        // The table deliberately does not exist: validation must trip first.
        let table = TableKey::new(SeriesKey::parse("GHOST", None).unwrap(), Interval::Day1);
        let now = NaiveDate::from_ymd_opt(2022, 3, 7)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();

        let cases = [
            BracketRequest::default(),
            BracketRequest {
                start_date: Some(now),
                ..Default::default()
            },
            BracketRequest {
                end_date: Some(now),
                ..Default::default()
            },
            BracketRequest {
                time_span: Some(Duration::days(7)),
                ..Default::default()
            },
            BracketRequest {
                row_span: Some(20),
                ..Default::default()
            },
        ];
        for request in cases {
            assert!(
                matches!(
                    resolve_bracket(&store, &table, &request),
                    Err(StoreError::UnderdeterminedBracket)
                ),
                "expected underdetermined: {request:?}"
            );
        }
    }

    #[test]
    fn exact_date_pair_roundtrips_to_ids() {
        let (store, table, points) = seeded_store();
        let bracket = resolve_bracket(
            &store,
            &table,
            &BracketRequest::between(points[3].timestamp, points[20].timestamp),
        )
        .unwrap();
        assert_eq!(
            bracket,
            RowBracket {
                start_id: 3,
                end_id: 20
            }
        );
    }

    #[test]
    fn date_plus_duration_derives_the_other_end() {
        let (store, table, points) = seeded_store();
        let delta = points[20].timestamp - points[3].timestamp;

        let forward = resolve_bracket(
            &store,
            &table,
            &BracketRequest {
                start_date: Some(points[3].timestamp),
                time_span: Some(delta),
                ..Default::default()
            },
        )
        .unwrap();
        let backward = resolve_bracket(
            &store,
            &table,
            &BracketRequest {
                end_date: Some(points[20].timestamp),
                time_span: Some(delta),
                ..Default::default()
            },
        )
        .unwrap();
        let expected = RowBracket {
            start_id: 3,
            end_id: 20,
        };
        assert_eq!(forward, expected);
        assert_eq!(backward, expected);
    }

    #[test]
    fn row_span_counts_from_the_anchor() {
        let (store, table, points) = seeded_store();

        let forward = resolve_bracket(
            &store,
            &table,
            &BracketRequest::from_start(points[3].timestamp, 10),
        )
        .unwrap();
        assert_eq!(
            forward,
            RowBracket {
                start_id: 3,
                end_id: 12
            }
        );

        let backward = resolve_bracket(
            &store,
            &table,
            &BracketRequest::until_end(points[20].timestamp, 10),
        )
        .unwrap();
        assert_eq!(
            backward,
            RowBracket {
                start_id: 11,
                end_id: 20
            }
        );
    }

    #[test]
    fn oversized_row_span_clamps_to_available_rows() {
        let (store, table, points) = seeded_store();

        // Three times the table, anchored at the first row: everything.
        let forward = resolve_bracket(
            &store,
            &table,
            &BracketRequest::from_start(points[0].timestamp, 75),
        )
        .unwrap();
        assert_eq!(
            forward,
            RowBracket {
                start_id: 0,
                end_id: 24
            }
        );

        // Counting backwards past the start of history clamps at row 0.
        let backward = resolve_bracket(
            &store,
            &table,
            &BracketRequest::until_end(points[24].timestamp, 75),
        )
        .unwrap();
        assert_eq!(
            backward,
            RowBracket {
                start_id: 0,
                end_id: 24
            }
        );
    }

    #[test]
    fn triple_span_over_forty_five_rows_clamps_at_forty_four() {
        let mut store = SeriesStore::open_in_memory().unwrap();
        let table = TableKey::new(SeriesKey::parse("AAPL", None).unwrap(), Interval::Day1);
        store.create_table(&table).unwrap();
        let start = NaiveDate::from_ymd_opt(2022, 3, 7)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let points = weekday_daily_series(start, 45, true);
        store.append_rows(&table, &points, 0).unwrap();

        let bracket = resolve_bracket(
            &store,
            &table,
            &BracketRequest::from_start(points[0].timestamp, 135),
        )
        .unwrap();
        assert_eq!(
            bracket,
            RowBracket {
                start_id: 0,
                end_id: 44
            }
        );
    }

    #[test]
    fn weekend_anchors_resolve_to_adjacent_trading_rows() {
        let (store, table, points) = seeded_store();
        // Rows 0..=4 are Mon-Fri of the first week; row 5 the next Monday.
        let saturday = points[4].timestamp + Duration::days(1);
        let next_weekend = saturday + Duration::days(7);

        let bracket = resolve_bracket(
            &store,
            &table,
            &BracketRequest::between(saturday, next_weekend),
        )
        .unwrap();
        // Start skips forward to Monday (row 5); end falls back to the
        // second Friday (row 9).
        assert_eq!(
            bracket,
            RowBracket {
                start_id: 5,
                end_id: 9
            }
        );
    }

    #[test]
    fn out_of_range_date_pairs_are_strict() {
        let (store, table, points) = seeded_store();
        let before = points[0].timestamp - Duration::days(60);
        let also_before = points[0].timestamp - Duration::days(10);
        let after = points[24].timestamp + Duration::days(10);
        let far_after = points[24].timestamp + Duration::days(60);

        assert!(matches!(
            resolve_bracket(&store, &table, &BracketRequest::between(before, also_before)),
            Err(StoreError::DataNotPresent { .. })
        ));
        assert!(matches!(
            resolve_bracket(&store, &table, &BracketRequest::between(after, far_after)),
            Err(StoreError::DataNotPresent { .. })
        ));

        // Duration variants derive a date pair, so they stay strict too.
        assert!(matches!(
            resolve_bracket(
                &store,
                &table,
                &BracketRequest {
                    start_date: Some(before),
                    time_span: Some(Duration::days(20)),
                    ..Default::default()
                }
            ),
            Err(StoreError::DataNotPresent { .. })
        ));
    }

    #[test]
    fn out_of_range_span_anchors_are_forgiven() {
        let (store, table, points) = seeded_store();
        let before = points[0].timestamp - Duration::days(60);
        let after = points[24].timestamp + Duration::days(60);

        // "Give me the 20 earliest points, my start guess was early."
        let from_early = resolve_bracket(
            &store,
            &table,
            &BracketRequest::from_start(before, 20),
        )
        .unwrap();
        assert_eq!(
            from_early,
            RowBracket {
                start_id: 0,
                end_id: 19
            }
        );

        // "Give me the 20 latest points, my end guess was late."
        let until_late = resolve_bracket(&store, &table, &BracketRequest::until_end(after, 20))
            .unwrap();
        assert_eq!(
            until_late,
            RowBracket {
                start_id: 5,
                end_id: 24
            }
        );

        // The opposite sides stay strict even with a span.
        assert!(matches!(
            resolve_bracket(&store, &table, &BracketRequest::until_end(before, 20)),
            Err(StoreError::DataNotPresent { .. })
        ));
        assert!(matches!(
            resolve_bracket(&store, &table, &BracketRequest::from_start(after, 20)),
            Err(StoreError::DataNotPresent { .. })
        ));
    }

    #[test]
    fn nonpositive_row_span_is_rejected() {
        let (store, table, points) = seeded_store();
        assert!(matches!(
            resolve_bracket(
                &store,
                &table,
                &BracketRequest::from_start(points[0].timestamp, 0)
            ),
            Err(StoreError::InvalidRowSpan(0))
        ));
    }

    #[test]
    fn duration_wins_over_row_span_when_both_present() {
        let (store, table, points) = seeded_store();
        let delta = points[10].timestamp - points[3].timestamp;
        let bracket = resolve_bracket(
            &store,
            &table,
            &BracketRequest {
                start_date: Some(points[3].timestamp),
                time_span: Some(delta),
                row_span: Some(2),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(
            bracket,
            RowBracket {
                start_id: 3,
                end_id: 10
            }
        );
    }

    #[test]
    fn fetch_by_dates_returns_rows_or_empty() {
        let (store, table, points) = seeded_store();

        let rows = fetch_by_dates(
            &store,
            &table,
            &BracketRequest::between(points[3].timestamp, points[7].timestamp),
        )
        .unwrap();
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[0].row_id, 3);
        assert_eq!(rows[4].point, points[7]);

        // Entirely before history: forgiven as empty, not an error.
        let before = points[0].timestamp - Duration::days(60);
        let also_before = points[0].timestamp - Duration::days(10);
        let empty = fetch_by_dates(
            &store,
            &table,
            &BracketRequest::between(before, also_before),
        )
        .unwrap();
        assert!(empty.is_empty());

        // Underdetermined input is still a real error.
        assert!(matches!(
            fetch_by_dates(&store, &table, &BracketRequest::default()),
            Err(StoreError::UnderdeterminedBracket)
        ));
    }
}
