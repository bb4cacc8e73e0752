//! Clock abstraction for determinism.

use chrono::{DateTime, Duration, Utc};

/// Abstraction over wall-clock time so activity timestamps and idle
/// eviction can be driven deterministically in tests.
pub trait Clock: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> DateTime<Utc>;

    /// Time elapsed between `since` and now, clamped at zero.
    fn elapsed_since(&self, since: DateTime<Utc>) -> Duration {
        (self.now() - since).max(Duration::zero())
    }
}

/// Production clock that delegates to the system clock.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
