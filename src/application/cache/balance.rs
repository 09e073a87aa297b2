//! TTL-bounded cache of wallet balances.
//!
//! Entries are served while `now - fetched_at < ttl`. A miss performs one
//! batched fetch from the [`BalanceSource`]. After a balance-mutating
//! execution the orchestrator calls [`BalanceCache::invalidate`], and a
//! fetch that started before the invalidation never repopulates the entry.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::debug;

use crate::domain::Balances;
use crate::error::Result;
use crate::port::outbound::balance::BalanceSource;
use crate::port::outbound::clock::{span, Clock};
use crate::port::outbound::store::CleanableStore;

/// Default entry lifetime.
pub const DEFAULT_BALANCE_TTL: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
struct CachedBalances {
    balances: Balances,
    fetched_at: DateTime<Utc>,
}

/// Per-wallet balance cache.
pub struct BalanceCache {
    source: Arc<dyn BalanceSource>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    coalesce: bool,
    entries: DashMap<String, CachedBalances>,
    /// Bumped by every invalidation of a key.
    generations: DashMap<String, u64>,
    /// One gate per key while coalescing is enabled.
    gates: DashMap<String, Arc<tokio::sync::Mutex<()>>>,
}

impl BalanceCache {
    #[must_use]
    pub fn new(source: Arc<dyn BalanceSource>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            source,
            clock,
            ttl,
            coalesce: false,
            entries: DashMap::new(),
            generations: DashMap::new(),
            gates: DashMap::new(),
        }
    }

    /// Share one in-flight fetch among concurrent readers of the same key.
    #[must_use]
    pub fn with_coalescing(mut self, coalesce: bool) -> Self {
        self.coalesce = coalesce;
        self
    }

    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cached balances for `subject_key`, fetching on a miss.
    ///
    /// # Errors
    ///
    /// Propagates the balance source error. Failures are never cached.
    pub async fn get_balances(&self, subject_key: &str) -> Result<Balances> {
        if let Some(balances) = self.lookup(subject_key) {
            debug!(key = subject_key, "Balance cache hit");
            return Ok(balances);
        }

        if !self.coalesce {
            return self.fetch(subject_key).await;
        }

        let gate = Arc::clone(self.gates.entry(subject_key.to_string()).or_default().value());
        let _permit = gate.lock().await;

        // A reader ahead of us in the gate may have filled the entry.
        if let Some(balances) = self.lookup(subject_key) {
            debug!(key = subject_key, "Balance cache hit after coalesced fetch");
            return Ok(balances);
        }
        self.fetch(subject_key).await
    }

    /// Drop the entry for `subject_key` so the next read refetches.
    pub fn invalidate(&self, subject_key: &str) {
        *self.generations.entry(subject_key.to_string()).or_insert(0) += 1;
        let removed = self.entries.remove(subject_key).is_some();
        debug!(key = subject_key, removed, "Balance cache invalidated");
    }

    /// Number of entries currently held, live or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn lookup(&self, subject_key: &str) -> Option<Balances> {
        let now = self.clock.now();
        let entry = self.entries.get(subject_key)?;
        if now - entry.fetched_at < span(self.ttl) {
            Some(entry.balances.clone())
        } else {
            None
        }
    }

    fn generation(&self, subject_key: &str) -> u64 {
        self.generations.get(subject_key).map_or(0, |g| *g)
    }

    async fn fetch(&self, subject_key: &str) -> Result<Balances> {
        let started = self.generation(subject_key);
        let balances = self.source.get_all_balances(subject_key).await?;
        let fetched_at = self.clock.now();

        // Holding the generation entry makes check-and-store atomic against
        // a concurrent invalidate.
        let generation = self.generations.entry(subject_key.to_string()).or_insert(0);
        if *generation == started {
            self.entries.insert(
                subject_key.to_string(),
                CachedBalances {
                    balances: balances.clone(),
                    fetched_at,
                },
            );
            debug!(key = subject_key, assets = balances.len(), "Balances cached");
        } else {
            debug!(key = subject_key, "Invalidated during fetch, not caching");
        }
        drop(generation);

        Ok(balances)
    }
}

impl CleanableStore for BalanceCache {
    fn delete_expired(&self) -> Result<usize> {
        let now = self.clock.now();
        let ttl = span(self.ttl);
        let before = self.entries.len();
        self.entries.retain(|_, entry| now - entry.fetched_at < ttl);
        self.gates.retain(|_, gate| Arc::strong_count(gate) > 1);
        Ok(before.saturating_sub(self.entries.len()))
    }

    fn store_name(&self) -> &'static str {
        "balance_cache"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::clock::ManualClock;
    use crate::testkit::collaborators::CountingBalanceSource;
    use rust_decimal_macros::dec;

    const WALLET: &str = "wallet-u1";

    fn setup(ttl_ms: u64) -> (BalanceCache, Arc<CountingBalanceSource>, ManualClock) {
        let source = Arc::new(CountingBalanceSource::new());
        source.set(WALLET, [("SOL", dec!(2)), ("USDC", dec!(150))].into_iter().collect());
        let clock = ManualClock::new();
        let cache = BalanceCache::new(
            source.clone(),
            Arc::new(clock.clone()),
            Duration::from_millis(ttl_ms),
        );
        (cache, source, clock)
    }

    #[tokio::test]
    async fn serves_cached_value_until_ttl_elapses() {
        let (cache, source, clock) = setup(10_000);

        let first = cache.get_balances(WALLET).await.unwrap();
        clock.advance_millis(9_999);
        let second = cache.get_balances(WALLET).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.amount("SOL"), dec!(2));
        assert_eq!(source.fetch_count(), 1);

        clock.advance_millis(1);
        cache.get_balances(WALLET).await.unwrap();
        assert_eq!(source.fetch_count(), 2);
    }

    #[tokio::test]
    async fn invalidate_forces_refetch() {
        let (cache, source, _clock) = setup(10_000);

        cache.get_balances(WALLET).await.unwrap();
        source.set(WALLET, [("SOL", dec!(1.5))].into_iter().collect());
        cache.invalidate(WALLET);

        let fresh = cache.get_balances(WALLET).await.unwrap();
        assert_eq!(fresh.amount("SOL"), dec!(1.5));
        assert_eq!(source.fetch_count(), 2);
    }

    #[tokio::test]
    async fn fetch_failure_is_not_cached() {
        let (cache, source, _clock) = setup(10_000);
        source.set_failing(true);

        assert!(cache.get_balances(WALLET).await.is_err());
        assert!(cache.is_empty());

        source.set_failing(false);
        let balances = cache.get_balances(WALLET).await.unwrap();
        assert_eq!(balances.amount("USDC"), dec!(150));
        assert_eq!(source.fetch_count(), 2);
    }

    #[tokio::test]
    async fn invalidation_during_fetch_wins() {
        let source = Arc::new(CountingBalanceSource::new().with_delay(Duration::from_millis(50)));
        let cache = Arc::new(BalanceCache::new(
            source.clone(),
            Arc::new(ManualClock::new()),
            Duration::from_secs(10),
        ));

        let reader = {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move { cache.get_balances(WALLET).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        cache.invalidate(WALLET);
        reader.await.unwrap().unwrap();

        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn coalesced_readers_share_one_fetch() {
        let source = Arc::new(CountingBalanceSource::new().with_delay(Duration::from_millis(30)));
        let cache = Arc::new(
            BalanceCache::new(
                source.clone(),
                Arc::new(ManualClock::new()),
                Duration::from_secs(10),
            )
            .with_coalescing(true),
        );

        let readers: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                tokio::spawn(async move { cache.get_balances(WALLET).await })
            })
            .collect();
        for reader in readers {
            reader.await.unwrap().unwrap();
        }

        assert_eq!(source.fetch_count(), 1);
    }

    #[tokio::test]
    async fn delete_expired_removes_stale_entries() {
        let (cache, _source, clock) = setup(1_000);
        cache.get_balances(WALLET).await.unwrap();
        cache.get_balances("wallet-u2").await.unwrap();

        assert_eq!(cache.delete_expired().unwrap(), 0);
        clock.advance_millis(1_000);
        assert_eq!(cache.delete_expired().unwrap(), 2);
        assert!(cache.is_empty());
    }
}
