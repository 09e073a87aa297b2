//! Time source port.
//!
//! Every TTL decision reads the time through a [`Clock`] so that expiry can
//! be tested deterministically.

use std::fmt::Debug;
use std::time::Duration;

use chrono::{DateTime, Utc};

/// Source of wall-clock time.
pub trait Clock: Send + Sync + Debug {
    fn now(&self) -> DateTime<Utc>;
}

/// The system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Convert a configured TTL into a signed chrono span.
///
/// Saturates instead of panicking on absurd values; configuration
/// validation keeps real TTLs far below the limit.
#[must_use]
pub fn span(ttl: Duration) -> chrono::Duration {
    let millis = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX / 2);
    chrono::Duration::milliseconds(millis.min(i64::MAX / 2))
}
