//! Scoped lease for one execution.
//!
//! While an [`ExecutionGuard`] is alive the subject holds its operation
//! lock. When the guard is finished or dropped, the wallet's cached
//! balances are invalidated and then the lease is released, in that order.
//! Dropping covers early returns, panics and cancelled futures (timeouts).

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, warn};

use crate::application::cache::balance::BalanceCache;
use crate::domain::{Lease, LockKey};
use crate::error::Result;
use crate::port::outbound::store::OperationLock;

/// Lease plus the cleanup owed when it ends.
pub struct ExecutionGuard {
    lock: Arc<dyn OperationLock>,
    cache: Arc<BalanceCache>,
    wallet_address: String,
    lease: Option<Lease>,
}

impl ExecutionGuard {
    /// Try to take the lock for `key`.
    ///
    /// Returns `Ok(None)` when another holder has a live lease.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock store fails.
    pub fn acquire(
        lock: Arc<dyn OperationLock>,
        cache: Arc<BalanceCache>,
        key: &LockKey,
        ttl: Duration,
        wallet_address: impl Into<String>,
    ) -> Result<Option<Self>> {
        let Some(lease) = lock.try_acquire(key, ttl)? else {
            return Ok(None);
        };
        debug!(key = %key, ttl_secs = ttl.as_secs(), "Operation lock acquired");
        Ok(Some(Self {
            lock,
            cache,
            wallet_address: wallet_address.into(),
            lease: Some(lease),
        }))
    }

    #[must_use]
    pub fn lease(&self) -> Option<&Lease> {
        self.lease.as_ref()
    }

    /// Run cleanup now instead of at drop.
    pub fn finish(mut self) {
        self.cleanup();
    }

    fn cleanup(&mut self) {
        let Some(lease) = self.lease.take() else {
            return;
        };

        self.cache.invalidate(&self.wallet_address);

        match self.lock.release(&lease) {
            Ok(true) => debug!(key = %lease.key, "Operation lock released"),
            Ok(false) => warn!(
                key = %lease.key,
                "Lease expired before release; lock may now belong to another holder"
            ),
            Err(e) => error!(key = %lease.key, error = %e, "Failed to release operation lock"),
        }
    }
}

impl Drop for ExecutionGuard {
    fn drop(&mut self) {
        self.cleanup();
    }
}
