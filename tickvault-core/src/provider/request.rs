//! Request construction for the market-data provider.
//!
//! Turns a (kind, query, credential) triple into a transport-ready
//! description: endpoint URL, query parameters, headers. Which of the two
//! upstream access paths gets hit is decided here by the credential tier and
//! is invisible to callers.

use chrono::NaiveDateTime;

use crate::auth::{ApiTier, Credential};
use crate::domain::{Interval, SeriesKey};

/// Base URL for direct provider accounts.
pub const DIRECT_BASE_URL: &str = "https://api.twelvedata.com";
/// Base URL for RapidAPI marketplace accounts.
pub const RAPID_BASE_URL: &str = "https://twelve-data1.p.rapidapi.com";
/// Host header required by the RapidAPI path.
pub const RAPIDAPI_HOST: &str = "twelve-data1.p.rapidapi.com";

/// The provider's hard row cap per response.
pub const PAGE_OUTPUT_SIZE: u32 = 5000;
/// Usable rows per page: one less than the cap, leaving room for the
/// stitching duplicate at each page join. A page shorter than this signals
/// the end of available history.
pub const MAX_PAGE_ROWS: usize = 4999;

/// Timezone pinned on time-series queries so boundary timestamps are stable
/// across venues.
const QUERY_TIMEZONE: &str = "Europe/London";

/// Every request shape the provider supports. Closed set: an unknown kind is
/// unrepresentable rather than a runtime error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    TimeSeries,
    EarliestTimestamp,
    ListStocks,
    ListForexPairs,
    ListExchanges,
    ListIndices,
    ApiUsage,
}

impl RequestKind {
    pub fn endpoint(self) -> &'static str {
        match self {
            RequestKind::TimeSeries => "/time_series",
            RequestKind::EarliestTimestamp => "/earliest_timestamp",
            RequestKind::ListStocks => "/stocks",
            RequestKind::ListForexPairs => "/forex_pairs",
            RequestKind::ListExchanges => "/exchange",
            RequestKind::ListIndices => "/indices",
            RequestKind::ApiUsage => "/api_usage",
        }
    }

    /// Time-series shaped requests pin the query timezone.
    fn pins_timezone(self) -> bool {
        matches!(self, RequestKind::TimeSeries | RequestKind::EarliestTimestamp)
    }
}

/// Response body format. The backfill pipeline always asks for JSON; CSV
/// exists for ad-hoc exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Csv,
}

impl OutputFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Json => "JSON",
            OutputFormat::Csv => "CSV",
        }
    }
}

/// A fully-formed request: URL, query parameters, headers.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    pub url: String,
    pub params: Vec<(String, String)>,
    pub headers: Vec<(&'static str, String)>,
}

/// Assemble the transport description for one request.
///
/// Rapid-tier credentials route to the marketplace base URL and authenticate
/// via headers; direct-tier credentials hit the provider directly and
/// authenticate via the `apikey` parameter.
pub fn build_request(
    kind: RequestKind,
    mut params: Vec<(String, String)>,
    credential: &Credential,
) -> RequestSpec {
    if kind.pins_timezone() {
        params.push(("timezone".into(), QUERY_TIMEZONE.into()));
    }

    let (base, headers) = match credential.tier {
        ApiTier::Rapid => (
            RAPID_BASE_URL,
            vec![
                ("X-RapidAPI-Key", credential.token().to_string()),
                ("X-RapidAPI-Host", RAPIDAPI_HOST.to_string()),
            ],
        ),
        ApiTier::Direct => {
            params.push(("apikey".into(), credential.token().to_string()));
            (DIRECT_BASE_URL, Vec::new())
        }
    };

    RequestSpec {
        url: format!("{base}{}", kind.endpoint()),
        params,
        headers,
    }
}

/// Parameters for one page of a time-series download.
#[derive(Debug, Clone)]
pub struct PageQuery {
    pub key: SeriesKey,
    pub interval: Interval,
    /// Inclusive: the provider returns the observation at exactly this
    /// timestamp when it exists.
    pub start_date: Option<NaiveDateTime>,
    /// Inclusive, like `start_date`.
    pub end_date: Option<NaiveDateTime>,
    /// Single exact observation instead of a range.
    pub exact_date: Option<NaiveDateTime>,
    pub output_size: u32,
    pub format: OutputFormat,
}

impl PageQuery {
    /// Maximum-size JSON page for a series, date brackets unset.
    pub fn new(key: SeriesKey, interval: Interval) -> Self {
        Self {
            key,
            interval,
            start_date: None,
            end_date: None,
            exact_date: None,
            output_size: PAGE_OUTPUT_SIZE,
            format: OutputFormat::Json,
        }
    }

    /// Serialize into provider query parameters, applying the USD currency
    /// and default-venue MIC for equities.
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params: Vec<(String, String)> = vec![
            ("symbol".into(), self.key.symbol()),
            ("interval".into(), self.interval.as_str().into()),
            ("format".into(), self.format.as_str().into()),
        ];
        if let SeriesKey::Equity { mic, .. } = &self.key {
            params.push(("mic_code".into(), mic.clone()));
            params.push(("currency".into(), "USD".into()));
        }
        // Dates always go out in full second precision; the provider accepts
        // that for daily series too.
        if let Some(start) = self.start_date {
            params.push(("start_date".into(), format_wire_date(start)));
        }
        if let Some(end) = self.end_date {
            params.push(("end_date".into(), format_wire_date(end)));
        }
        if let Some(date) = self.exact_date {
            params.push(("date".into(), format_wire_date(date)));
        }
        params.push(("outputsize".into(), self.output_size.to_string()));
        params
    }
}

/// Parameters for an earliest-available-timestamp probe.
pub fn earliest_timestamp_params(key: &SeriesKey, interval: Interval) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = vec![
        ("symbol".into(), key.symbol()),
        ("interval".into(), interval.as_str().into()),
    ];
    if let SeriesKey::Equity { mic, .. } = key {
        params.push(("mic_code".into(), mic.clone()));
    }
    params
}

fn format_wire_date(ts: NaiveDateTime) -> String {
    ts.format("%Y-%m-%d %H:%M:%S").to_string()
}
