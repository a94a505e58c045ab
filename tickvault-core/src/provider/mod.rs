//! Provider access: request building, wire parsing, the HTTP client, and
//! the paginated backfill engine.

pub mod backfill;
pub mod client;
pub mod estimator;
pub mod request;
pub mod wire;

use thiserror::Error;

pub use backfill::{backfill, BackfillRequest, MarketDataSource};
pub use client::TwelveDataClient;
pub use estimator::estimate_iterations;
pub use request::{
    build_request, OutputFormat, PageQuery, RequestKind, RequestSpec, MAX_PAGE_ROWS,
    PAGE_OUTPUT_SIZE,
};
pub use wire::{ApiUsageReport, ExchangeRecord, ForexPairRecord, StockRecord};

/// Errors crossing the provider boundary.
///
/// None of these are retried internally: transport errors surface as-is and
/// malformed or rejected responses are fatal to the call that hit them.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("network error: {0}")]
    Network(String),

    #[error("upstream rejected the query (code {code}): {message}")]
    Upstream { code: i64, message: String },

    #[error("malformed provider response: {0}")]
    MalformedResponse(String),
}
