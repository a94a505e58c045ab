//! TickVault Core — rate-limited market-data backfill and row-bracket
//! lookups.
//!
//! The pipeline, leaves first:
//! - Credential rotation under the provider's requests-per-window limit
//! - Query building for the provider's two authenticated access paths
//! - A paginated backfill engine that stitches 5000-row pages into one
//!   gapless, strictly-ordered series and detects the true end of history
//! - A relational series store assigning dense integer row IDs in
//!   insertion order
//! - A bracket resolver translating caller date constraints into inclusive
//!   [start_id, end_id] row ranges, tolerant of weekends and gaps
//!
//! Everything is synchronous and blocking: pages are causally dependent, so
//! a backfill has nothing useful to do concurrently, and the rotator's wait
//! is the intended serialization point. Scaling happens across independent
//! jobs with disjoint credential subsets, not inside one job.

pub mod auth;
pub mod config;
pub mod domain;
pub mod ingest;
pub mod provider;
pub mod store;

#[cfg(test)]
pub(crate) mod testutil;

pub use config::{AppConfig, ConfigError};
