//! In-memory operation lock.

use std::sync::Arc;
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::domain::{Lease, LeaseToken, LockKey};
use crate::error::Result;
use crate::port::outbound::clock::{span, Clock};
use crate::port::outbound::store::{CleanableStore, OperationLock};

/// Leases held in a concurrent map keyed by [`LockKey`].
#[derive(Debug)]
pub struct MemoryOperationLock {
    leases: DashMap<LockKey, Lease>,
    clock: Arc<dyn Clock>,
}

impl MemoryOperationLock {
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            leases: DashMap::new(),
            clock,
        }
    }

    /// Whether `key` currently has a live lease.
    #[must_use]
    pub fn is_held(&self, key: &LockKey) -> bool {
        let now = self.clock.now();
        self.leases.get(key).is_some_and(|lease| lease.is_live(now))
    }
}

impl OperationLock for MemoryOperationLock {
    fn try_acquire(&self, key: &LockKey, ttl: Duration) -> Result<Option<Lease>> {
        let now = self.clock.now();
        let lease = Lease {
            key: key.clone(),
            token: LeaseToken::new(),
            acquired_at: now,
            expires_at: now + span(ttl),
        };

        match self.leases.entry(key.clone()) {
            Entry::Occupied(mut held) => {
                if held.get().is_live(now) {
                    return Ok(None);
                }
                held.insert(lease.clone());
            }
            Entry::Vacant(slot) => {
                slot.insert(lease.clone());
            }
        }
        Ok(Some(lease))
    }

    fn release(&self, lease: &Lease) -> Result<bool> {
        Ok(self
            .leases
            .remove_if(&lease.key, |_, held| held.token == lease.token)
            .is_some())
    }
}

impl CleanableStore for MemoryOperationLock {
    fn delete_expired(&self) -> Result<usize> {
        let now = self.clock.now();
        let before = self.leases.len();
        self.leases.retain(|_, lease| lease.is_live(now));
        Ok(before.saturating_sub(self.leases.len()))
    }

    fn store_name(&self) -> &'static str {
        "operation_locks"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{OperationClass, SubjectId};
    use crate::testkit::clock::ManualClock;
    use crate::testkit::domain::swap_lock;

    const TTL: Duration = Duration::from_secs(60);

    fn lock() -> (Arc<MemoryOperationLock>, ManualClock) {
        let clock = ManualClock::new();
        (Arc::new(MemoryOperationLock::new(Arc::new(clock.clone()))), clock)
    }

    #[test]
    fn second_acquire_fails_while_held() {
        let (lock, _clock) = lock();
        let key = swap_lock("u1");

        assert!(lock.try_acquire(&key, TTL).unwrap().is_some());
        assert!(lock.try_acquire(&key, TTL).unwrap().is_none());
        assert!(lock.is_held(&key));
    }

    #[test]
    fn release_frees_the_key() {
        let (lock, _clock) = lock();
        let key = swap_lock("u1");

        let lease = lock.try_acquire(&key, TTL).unwrap().unwrap();
        assert!(lock.release(&lease).unwrap());
        assert!(lock.try_acquire(&key, TTL).unwrap().is_some());
    }

    #[test]
    fn different_classes_do_not_contend() {
        let (lock, _clock) = lock();
        let subject = SubjectId::new("u1");
        let swap = LockKey::new(subject.clone(), OperationClass::Swap);
        let wallet = LockKey::new(subject, OperationClass::WalletCreate);

        assert!(lock.try_acquire(&swap, TTL).unwrap().is_some());
        assert!(lock.try_acquire(&wallet, TTL).unwrap().is_some());
    }

    #[test]
    fn expired_lease_can_be_taken_over() {
        let (lock, clock) = lock();
        let key = swap_lock("u1");
        lock.try_acquire(&key, TTL).unwrap().unwrap();

        clock.advance(Duration::from_millis(59_999));
        assert!(lock.try_acquire(&key, TTL).unwrap().is_none());

        clock.advance_millis(1);
        assert!(lock.try_acquire(&key, TTL).unwrap().is_some());
    }

    #[test]
    fn stale_release_does_not_free_new_holder() {
        let (lock, clock) = lock();
        let key = swap_lock("u1");
        let stale = lock.try_acquire(&key, TTL).unwrap().unwrap();

        clock.advance(TTL);
        let current = lock.try_acquire(&key, TTL).unwrap().unwrap();

        assert!(!lock.release(&stale).unwrap());
        assert!(lock.try_acquire(&key, TTL).unwrap().is_none());
        assert!(lock.release(&current).unwrap());
    }

    #[test]
    fn concurrent_acquires_yield_one_holder() {
        let (lock, _clock) = lock();
        let key = swap_lock("u1");

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let lock = Arc::clone(&lock);
                let key = key.clone();
                std::thread::spawn(move || lock.try_acquire(&key, TTL).unwrap().is_some())
            })
            .collect();
        let holders = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|held| *held)
            .count();

        assert_eq!(holders, 1);
    }

    #[test]
    fn delete_expired_removes_dead_leases() {
        let (lock, clock) = lock();
        lock.try_acquire(&swap_lock("u1"), Duration::from_secs(1)).unwrap();
        lock.try_acquire(&swap_lock("u2"), TTL).unwrap();

        clock.advance(Duration::from_secs(2));
        assert_eq!(lock.delete_expired().unwrap(), 1);
        assert!(lock.is_held(&swap_lock("u2")));
    }
}
