//! Store ports for confirmation sessions, operation locks and rate limits.
//!
//! Each store exposes a narrow contract whose check-and-act operations are
//! atomic with respect to concurrent callers. Correctness is enforced by TTL
//! checks at read time; [`CleanableStore::delete_expired`] is housekeeping.
//!
//! # Thread Safety
//!
//! Implementations must be `Send + Sync`: the orchestrator is invoked
//! concurrently by independent request handlers.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::domain::{
    ConfirmationDraft, ConfirmationSession, Lease, LockKey, Quote, SessionId,
};
use crate::error::Result;

/// Periodic cleanup contract shared by every TTL-based store.
pub trait CleanableStore: Send + Sync {
    /// Physically remove entries whose TTL has elapsed.
    ///
    /// Returns the number of entries removed.
    fn delete_expired(&self) -> Result<usize>;

    /// Store name for logging and sweep reports.
    fn store_name(&self) -> &'static str;
}

/// Settings shared by confirmation store implementations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmationSettings {
    /// Lifetime of a session, reset on each re-confirmation.
    pub ttl: Duration,
    /// How many times a session's quote may be refreshed.
    pub max_reconfirms: u32,
}

impl Default for ConfirmationSettings {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(60),
            max_reconfirms: 1,
        }
    }
}

/// Short-lived confirmation sessions keyed by an opaque session id.
///
/// A session id that was consumed, cancelled, or has expired never yields a
/// session again.
pub trait ConfirmationStore: CleanableStore {
    /// Insert a new session with a freshly generated id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionCollision`](crate::error::Error::SessionCollision)
    /// instead of overwriting an existing session.
    fn store(&self, draft: ConfirmationDraft) -> Result<SessionId>;

    /// Non-destructive read. `None` when absent or expired.
    fn get(&self, session_id: &SessionId) -> Result<Option<ConfirmationSession>>;

    /// Atomically read and delete a live session.
    ///
    /// Of two concurrent calls on the same id, exactly one observes the session.
    fn consume(&self, session_id: &SessionId) -> Result<Option<ConfirmationSession>>;

    /// Replace the quote of a live session, incrementing its reconfirm count
    /// and extending its expiry to `now + ttl`.
    ///
    /// Returns `false` if the session is absent, expired, or already at the
    /// reconfirm cap.
    fn update_quote(&self, session_id: &SessionId, quote: Quote) -> Result<bool>;

    /// Delete unconditionally. Returns whether something was deleted.
    fn cancel(&self, session_id: &SessionId) -> Result<bool>;

    /// Store settings (TTL and reconfirm cap).
    fn settings(&self) -> ConfirmationSettings;

    /// Session lifetime in whole seconds, for user-facing display.
    fn ttl_seconds(&self) -> u64 {
        self.settings().ttl.as_secs()
    }
}

/// Per-key mutual-exclusion leases with TTL.
///
/// A lease whose TTL has elapsed is indistinguishable from an absent lease.
pub trait OperationLock: CleanableStore {
    /// Acquire the lock for `key` iff no live lease exists.
    ///
    /// The check and the write are a single atomic step. Returns `None`
    /// without side effects when the lock is held.
    fn try_acquire(&self, key: &LockKey, ttl: Duration) -> Result<Option<Lease>>;

    /// Release a lease, but only if it is still the one stored for its key
    /// (compare-and-delete on the lease token).
    ///
    /// Returns `false` when the lease had already expired and been replaced
    /// or removed.
    fn release(&self, lease: &Lease) -> Result<bool>;
}

/// Fixed-window limit applied per key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    /// Requests allowed per window.
    pub limit: u32,
    /// Window length.
    pub window: Duration,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            limit: 5,
            window: Duration::from_secs(60),
        }
    }
}

/// Outcome of a rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    /// Requests recorded in the current window, including this one.
    pub count: u32,
}

/// Fixed-window request counter.
pub trait RateLimiter: CleanableStore {
    /// Record a request for `key` at `now` and report whether it is allowed.
    ///
    /// Starts a new window with count 1 when none exists or the previous
    /// one has elapsed; otherwise increments. The check and the record are
    /// a single atomic step.
    fn check_and_record(&self, key: &str, now: DateTime<Utc>) -> Result<RateDecision>;

    fn policy(&self) -> RateLimitPolicy;
}
