//! Blocking HTTP client for the market-data provider.
//!
//! One client serves both credential tiers; [`build_request`] routes each
//! call to the right base URL and auth scheme. Transport failures map to
//! [`ProviderError::Network`] and are not retried here — retry policy
//! belongs to the caller.

use std::time::Duration;

use chrono::NaiveDateTime;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::auth::{ApiTier, Credential};
use crate::domain::{Interval, SeriesKey, SeriesPoint};
use crate::provider::request::{
    build_request, earliest_timestamp_params, PageQuery, RequestKind, RequestSpec,
};
use crate::provider::wire::{
    parse_api_usage, parse_earliest_timestamp, parse_reference, parse_time_series,
    ApiUsageEnvelope, ApiUsageReport, EarliestTimestampEnvelope, ExchangeRecord, ForexPairRecord,
    ReferenceEnvelope, StockRecord, TimeSeriesEnvelope,
};
use crate::provider::{MarketDataSource, ProviderError};

/// Blocking client over the provider's HTTP API.
pub struct TwelveDataClient {
    http: reqwest::blocking::Client,
}

impl TwelveDataClient {
    pub fn new() -> Self {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("tickvault/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("failed to build HTTP client");
        Self { http }
    }

    fn get_response(
        &self,
        spec: &RequestSpec,
    ) -> Result<reqwest::blocking::Response, ProviderError> {
        let mut request = self.http.get(&spec.url).query(&spec.params);
        for (name, value) in &spec.headers {
            request = request.header(*name, value);
        }
        debug!(url = %spec.url, "provider request");
        request
            .send()
            .map_err(|e| ProviderError::Network(e.to_string()))
    }

    fn get_json<T: DeserializeOwned>(&self, spec: &RequestSpec) -> Result<T, ProviderError> {
        self.get_response(spec)?
            .json()
            .map_err(|e| ProviderError::MalformedResponse(e.to_string()))
    }

    /// All stocks the provider lists, with plan coverage info.
    pub fn list_stocks(&self, credential: &Credential) -> Result<Vec<StockRecord>, ProviderError> {
        let params = vec![("show_plan".to_string(), "true".to_string())];
        let spec = build_request(RequestKind::ListStocks, params, credential);
        let envelope: ReferenceEnvelope<StockRecord> = self.get_json(&spec)?;
        parse_reference(envelope)
    }

    /// All currency pairs with downloadable history.
    pub fn list_forex_pairs(
        &self,
        credential: &Credential,
    ) -> Result<Vec<ForexPairRecord>, ProviderError> {
        let spec = build_request(RequestKind::ListForexPairs, Vec::new(), credential);
        let envelope: ReferenceEnvelope<ForexPairRecord> = self.get_json(&spec)?;
        parse_reference(envelope)
    }

    /// All exchanges with their countries and timezones.
    pub fn list_exchanges(
        &self,
        credential: &Credential,
    ) -> Result<Vec<ExchangeRecord>, ProviderError> {
        let spec = build_request(RequestKind::ListExchanges, Vec::new(), credential);
        let envelope: ReferenceEnvelope<ExchangeRecord> = self.get_json(&spec)?;
        parse_reference(envelope)
    }

    /// Token usage for one credential.
    ///
    /// Direct keys have a usage endpoint. The marketplace path has none, so
    /// usage is reconstructed from the credit headers of a cheap probe call.
    pub fn api_usage(&self, credential: &Credential) -> Result<ApiUsageReport, ProviderError> {
        match credential.tier {
            ApiTier::Direct => {
                let spec = build_request(RequestKind::ApiUsage, Vec::new(), credential);
                let envelope: ApiUsageEnvelope = self.get_json(&spec)?;
                parse_api_usage(envelope)
            }
            ApiTier::Rapid => {
                let spec = build_request(RequestKind::EarliestTimestamp, Vec::new(), credential);
                let response = self.get_response(&spec)?;
                let used = header_u64(&response, "Api-Credits-Used")?;
                let left = header_u64(&response, "Api-Credits-Left")?;
                Ok(ApiUsageReport {
                    current_usage: used,
                    plan_limit: used + left,
                })
            }
        }
    }
}

fn header_u64(
    response: &reqwest::blocking::Response,
    name: &str,
) -> Result<u64, ProviderError> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .ok_or_else(|| {
            ProviderError::MalformedResponse(format!("missing or unreadable header '{name}'"))
        })
}

impl Default for TwelveDataClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MarketDataSource for TwelveDataClient {
    fn earliest_timestamp(
        &self,
        key: &SeriesKey,
        interval: Interval,
        credential: &Credential,
    ) -> Result<NaiveDateTime, ProviderError> {
        let params = earliest_timestamp_params(key, interval);
        let spec = build_request(RequestKind::EarliestTimestamp, params, credential);
        let envelope: EarliestTimestampEnvelope = self.get_json(&spec)?;
        parse_earliest_timestamp(envelope, interval)
    }

    fn fetch_page(
        &self,
        query: &PageQuery,
        credential: &Credential,
    ) -> Result<Vec<SeriesPoint>, ProviderError> {
        let spec = build_request(RequestKind::TimeSeries, query.to_params(), credential);
        let envelope: TimeSeriesEnvelope = self.get_json(&spec)?;
        parse_time_series(envelope, query.interval)
    }
}
