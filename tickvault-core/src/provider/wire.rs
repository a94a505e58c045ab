//! Wire-format parsing for provider responses.
//!
//! The provider wraps everything in a JSON envelope. Success carries a
//! `values` array (newest first, prices as strings); failure carries a
//! `code`/`message` pair even with HTTP 200, so every envelope is checked
//! for a rejection before its payload is trusted.

use chrono::NaiveDateTime;
use serde::Deserialize;

use crate::domain::{Interval, SeriesPoint};
use crate::provider::ProviderError;

/// Envelope for `/time_series` responses.
#[derive(Debug, Deserialize)]
pub struct TimeSeriesEnvelope {
    pub status: Option<String>,
    pub values: Option<Vec<WireValue>>,
    pub code: Option<i64>,
    pub message: Option<String>,
}

/// One observation as serialized on the wire.
#[derive(Debug, Clone, Deserialize)]
pub struct WireValue {
    pub datetime: String,
    pub open: String,
    pub high: String,
    pub low: String,
    pub close: String,
    #[serde(default)]
    pub volume: Option<String>,
}

/// Envelope for `/earliest_timestamp` responses.
#[derive(Debug, Deserialize)]
pub struct EarliestTimestampEnvelope {
    pub datetime: Option<String>,
    pub unix_time: Option<i64>,
    pub code: Option<i64>,
    pub message: Option<String>,
}

/// Envelope for reference-list responses (`/stocks`, `/forex_pairs`,
/// `/exchange`).
#[derive(Debug, Deserialize)]
pub struct ReferenceEnvelope<T> {
    pub data: Option<Vec<T>>,
    pub code: Option<i64>,
    pub message: Option<String>,
}

/// One listed stock, as served by `/stocks`.
#[derive(Debug, Clone, Deserialize)]
pub struct StockRecord {
    pub symbol: String,
    pub name: String,
    pub currency: String,
    pub exchange: String,
    pub mic_code: String,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

/// One listed currency pair, as served by `/forex_pairs`.
#[derive(Debug, Clone, Deserialize)]
pub struct ForexPairRecord {
    pub symbol: String,
    pub currency_group: String,
    pub currency_base: String,
    pub currency_quote: String,
}

/// One listed exchange, as served by `/exchange`.
#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeRecord {
    pub name: String,
    pub code: String,
    pub country: String,
    pub timezone: String,
}

/// Envelope for `/api_usage` (direct-tier keys only).
#[derive(Debug, Deserialize)]
pub struct ApiUsageEnvelope {
    pub timestamp: Option<String>,
    pub current_usage: Option<u64>,
    pub plan_limit: Option<u64>,
    pub code: Option<i64>,
    pub message: Option<String>,
}

/// Token usage for one credential, tier differences normalized away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiUsageReport {
    pub current_usage: u64,
    pub plan_limit: u64,
}

/// A `code` in the envelope marks an upstream rejection regardless of the
/// HTTP status. `404` is a connection-level failure, never an empty result.
fn check_rejection(code: Option<i64>, message: &Option<String>) -> Result<(), ProviderError> {
    match code {
        Some(code) if code != 200 => Err(ProviderError::Upstream {
            code,
            message: message.clone().unwrap_or_else(|| "no message".into()),
        }),
        _ => Ok(()),
    }
}

/// Parse a time-series envelope into points, newest-first order preserved.
pub fn parse_time_series(
    envelope: TimeSeriesEnvelope,
    interval: Interval,
) -> Result<Vec<SeriesPoint>, ProviderError> {
    check_rejection(envelope.code, &envelope.message)?;
    let values = envelope.values.ok_or_else(|| {
        ProviderError::MalformedResponse("time-series envelope without 'values'".into())
    })?;
    values
        .iter()
        .map(|value| parse_value(value, interval))
        .collect()
}

fn parse_value(value: &WireValue, interval: Interval) -> Result<SeriesPoint, ProviderError> {
    let timestamp = interval.parse_timestamp(&value.datetime).ok_or_else(|| {
        ProviderError::MalformedResponse(format!(
            "unparseable datetime '{}' for interval {interval}",
            value.datetime
        ))
    })?;
    Ok(SeriesPoint {
        timestamp,
        open: parse_price("open", &value.open)?,
        high: parse_price("high", &value.high)?,
        low: parse_price("low", &value.low)?,
        close: parse_price("close", &value.close)?,
        volume: value
            .volume
            .as_deref()
            .map(|raw| {
                raw.parse::<u64>().map_err(|_| {
                    ProviderError::MalformedResponse(format!("unparseable volume '{raw}'"))
                })
            })
            .transpose()?,
    })
}

fn parse_price(field: &str, raw: &str) -> Result<f64, ProviderError> {
    raw.parse::<f64>().map_err(|_| {
        ProviderError::MalformedResponse(format!("unparseable {field} price '{raw}'"))
    })
}

/// Parse an earliest-timestamp envelope with the interval's datetime format.
pub fn parse_earliest_timestamp(
    envelope: EarliestTimestampEnvelope,
    interval: Interval,
) -> Result<NaiveDateTime, ProviderError> {
    check_rejection(envelope.code, &envelope.message)?;
    let raw = envelope.datetime.ok_or_else(|| {
        ProviderError::MalformedResponse("earliest-timestamp envelope without 'datetime'".into())
    })?;
    interval.parse_timestamp(&raw).ok_or_else(|| {
        ProviderError::MalformedResponse(format!(
            "unparseable earliest timestamp '{raw}' for interval {interval}"
        ))
    })
}

/// Unwrap a reference-list envelope into its records.
pub fn parse_reference<T>(envelope: ReferenceEnvelope<T>) -> Result<Vec<T>, ProviderError> {
    check_rejection(envelope.code, &envelope.message)?;
    envelope.data.ok_or_else(|| {
        ProviderError::MalformedResponse("reference envelope without 'data'".into())
    })
}

/// Unwrap an api-usage envelope into a report.
pub fn parse_api_usage(envelope: ApiUsageEnvelope) -> Result<ApiUsageReport, ProviderError> {
    check_rejection(envelope.code, &envelope.message)?;
    match (envelope.current_usage, envelope.plan_limit) {
        (Some(current_usage), Some(plan_limit)) => Ok(ApiUsageReport {
            current_usage,
            plan_limit,
        }),
        _ => Err(ProviderError::MalformedResponse(
            "api-usage envelope without usage fields".into(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_equity_values_newest_first() {
        let envelope: TimeSeriesEnvelope = serde_json::from_str(
            r#"{
                "status": "ok",
                "values": [
                    {"datetime": "2022-03-22 11:21:00", "open": "265.0", "high": "265.5",
                     "low": "264.2", "close": "265.1", "volume": "10500"},
                    {"datetime": "2022-03-22 11:20:00", "open": "264.1", "high": "265.2",
                     "low": "264.0", "close": "265.0", "volume": "9800"}
                ],
                "meta": {"symbol": "NVDA"}
            }"#,
        )
        .unwrap();
        let points = parse_time_series(envelope, Interval::Min1).unwrap();
        assert_eq!(points.len(), 2);
        assert!(points[0].timestamp > points[1].timestamp);
        assert_eq!(points[0].volume, Some(10_500));
        assert_eq!(points[1].close, 265.0);
    }

    #[test]
    fn parses_forex_values_without_volume() {
        let envelope: TimeSeriesEnvelope = serde_json::from_str(
            r#"{"values": [
                {"datetime": "2022-03-22", "open": "0.9071", "high": "0.9104",
                 "low": "0.9056", "close": "0.9080"}
            ]}"#,
        )
        .unwrap();
        let points = parse_time_series(envelope, Interval::Day1).unwrap();
        assert_eq!(points[0].volume, None);
        assert_eq!(
            Interval::Day1.format_timestamp(points[0].timestamp),
            "2022-03-22"
        );
    }

    #[test]
    fn rejection_envelope_is_a_connection_failure() {
        let envelope: TimeSeriesEnvelope = serde_json::from_str(
            r#"{"code": 404, "message": "symbol not found", "status": "error"}"#,
        )
        .unwrap();
        let err = parse_time_series(envelope, Interval::Min1).unwrap_err();
        assert!(matches!(err, ProviderError::Upstream { code: 404, .. }));
    }

    #[test]
    fn missing_values_is_malformed() {
        let envelope: TimeSeriesEnvelope =
            serde_json::from_str(r#"{"status": "ok"}"#).unwrap();
        assert!(matches!(
            parse_time_series(envelope, Interval::Min1),
            Err(ProviderError::MalformedResponse(_))
        ));
    }

    #[test]
    fn garbled_price_is_malformed() {
        let envelope: TimeSeriesEnvelope = serde_json::from_str(
            r#"{"values": [
                {"datetime": "2022-03-22 11:20:00", "open": "n/a", "high": "1",
                 "low": "1", "close": "1"}
            ]}"#,
        )
        .unwrap();
        assert!(matches!(
            parse_time_series(envelope, Interval::Min1),
            Err(ProviderError::MalformedResponse(_))
        ));
    }

    #[test]
    fn earliest_timestamp_parses_per_interval() {
        let envelope: EarliestTimestampEnvelope =
            serde_json::from_str(r#"{"datetime": "2004-08-19", "unix_time": 1092873600}"#).unwrap();
        let ts = parse_earliest_timestamp(envelope, Interval::Day1).unwrap();
        assert_eq!(Interval::Day1.format_timestamp(ts), "2004-08-19");
    }

    #[test]
    fn reference_list_roundtrip() {
        let envelope: ReferenceEnvelope<StockRecord> = serde_json::from_str(
            r#"{"data": [
                {"symbol": "AAPL", "name": "Apple Inc", "currency": "USD",
                 "exchange": "NASDAQ", "mic_code": "XNGS",
                 "country": "United States", "type": "Common Stock"}
            ]}"#,
        )
        .unwrap();
        let stocks = parse_reference(envelope).unwrap();
        assert_eq!(stocks[0].mic_code, "XNGS");
        assert_eq!(stocks[0].kind.as_deref(), Some("Common Stock"));
    }
}
