//! Credentials and rate-limited rotation.

pub mod credential;
pub mod rotator;

pub use credential::{ApiTier, Credential, CredentialPool};
pub use rotator::{Clock, KeyRotator, SystemClock, RATE_LIMIT_WINDOW};
