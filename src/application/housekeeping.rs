//! Periodic sweep of expired store entries.
//!
//! Deleting expired entries is housekeeping only: every store already
//! treats an expired entry as absent. The sweeper keeps memory and table
//! sizes bounded.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::port::outbound::store::CleanableStore;

/// Result of sweeping one store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSweep {
    pub store: &'static str,
    /// Entries removed, or the error message if the sweep failed.
    pub outcome: Result<usize, String>,
}

/// Result of one sweep over every registered store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub stores: Vec<StoreSweep>,
}

impl SweepReport {
    /// Total entries removed across stores that swept successfully.
    #[must_use]
    pub fn removed(&self) -> usize {
        self.stores
            .iter()
            .filter_map(|s| s.outcome.as_ref().ok())
            .sum()
    }

    /// Number of stores whose sweep failed.
    #[must_use]
    pub fn failures(&self) -> usize {
        self.stores.iter().filter(|s| s.outcome.is_err()).count()
    }
}

/// Calls [`CleanableStore::delete_expired`] on a set of stores.
pub struct Sweeper {
    stores: Vec<Arc<dyn CleanableStore>>,
    interval: Duration,
}

impl Sweeper {
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            stores: Vec::new(),
            interval,
        }
    }

    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn CleanableStore>) -> Self {
        self.stores.push(store);
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.stores.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }

    /// Sweep every store once. A failing store does not stop the others.
    pub fn sweep_once(&self) -> SweepReport {
        let stores = self
            .stores
            .iter()
            .map(|store| {
                let name = store.store_name();
                let outcome = store.delete_expired().map_err(|e| {
                    warn!(store = name, error = %e, "Failed to sweep expired entries");
                    e.to_string()
                });
                if let Ok(removed) = outcome {
                    debug!(store = name, removed, "Swept expired entries");
                }
                StoreSweep {
                    store: name,
                    outcome,
                }
            })
            .collect();
        SweepReport { stores }
    }

    /// Sweep on a fixed interval until `shutdown` turns true or closes.
    pub fn spawn(self, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            info!(
                stores = self.stores.len(),
                interval_secs = self.interval.as_secs(),
                "Sweeper started"
            );

            loop {
                tokio::select! {
                    result = shutdown.changed() => {
                        if result.is_err() || *shutdown.borrow() {
                            info!("Sweeper stopping");
                            break;
                        }
                    }
                    _ = ticker.tick() => {
                        let report = self.sweep_once();
                        if report.removed() > 0 || report.failures() > 0 {
                            info!(
                                removed = report.removed(),
                                failures = report.failures(),
                                "Sweep complete"
                            );
                        }
                    }
                }
            }
        })
    }
}
