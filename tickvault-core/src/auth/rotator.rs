//! Round-robin credential rotation under the provider's rate-limit window.
//!
//! The provider allows 8 requests per key per window. Dispensing each key of
//! the active subset once per cycle, and holding the cycle cadence at or
//! above the window, keeps the aggregate request rate inside the limit. The
//! rotator sleeps only the *remainder* of the window, so time already spent
//! making requests between dispenses counts toward it — a pool of size 1
//! still self-throttles correctly.

use std::time::{Duration, Instant};

use tracing::debug;

use crate::auth::{Credential, CredentialPool};
use crate::config::ConfigError;

/// Minimum wall-clock duration between the starts of two rotation cycles.
/// Slightly under 8 seconds, matching the provider's observed enforcement.
pub const RATE_LIMIT_WINDOW: Duration = Duration::from_millis(7970);

/// Time source the rotator runs against. Production uses [`SystemClock`];
/// tests inject a fake to make throttling deterministic.
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

/// Real wall clock with a blocking sleep. Nothing else in a backfill job
/// needs to run while the rotator waits, so a plain thread sleep is correct.
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Cycles through a caller-restricted credential subset in fixed order,
/// waiting out the rate-limit window between cycles.
#[derive(Debug)]
pub struct KeyRotator<C: Clock = SystemClock> {
    pool: Vec<Credential>,
    window: Duration,
    cursor: usize,
    cycle_started: Option<Instant>,
    clock: C,
}

impl KeyRotator<SystemClock> {
    /// Rotator over `restriction` drawn from the configured pool; `None`
    /// uses the entire pool. Empty or unknown selections fail here, before
    /// any request is made.
    pub fn new(pool: &CredentialPool, restriction: Option<&[String]>) -> Result<Self, ConfigError> {
        Self::with_clock(pool, restriction, RATE_LIMIT_WINDOW, SystemClock)
    }
}

impl<C: Clock> KeyRotator<C> {
    pub fn with_clock(
        pool: &CredentialPool,
        restriction: Option<&[String]>,
        window: Duration,
        clock: C,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            pool: pool.select(restriction)?,
            window,
            cursor: 0,
            cycle_started: None,
            clock,
        })
    }

    /// Dispense the next credential, blocking first when a fresh cycle would
    /// start before the window since the previous cycle began has elapsed.
    pub fn next(&mut self) -> &Credential {
        if self.cursor == self.pool.len() {
            if let Some(started) = self.cycle_started {
                let elapsed = self.clock.now().saturating_duration_since(started);
                if elapsed < self.window {
                    let remainder = self.window - elapsed;
                    debug!(remainder_ms = remainder.as_millis() as u64, "waiting out rate-limit window");
                    self.clock.sleep(remainder);
                }
            }
            self.cursor = 0;
        }
        if self.cursor == 0 {
            self.cycle_started = Some(self.clock.now());
        }
        let credential = &self.pool[self.cursor];
        self.cursor += 1;
        credential
    }

    /// Number of credentials dispensed per cycle.
    pub fn cycle_len(&self) -> usize {
        self.pool.len()
    }
}
