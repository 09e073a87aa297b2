//! In-memory fixed-window rate limiter.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::error::Result;
use crate::port::outbound::clock::{span, Clock};
use crate::port::outbound::store::{CleanableStore, RateDecision, RateLimitPolicy, RateLimiter};

#[derive(Debug, Clone, Copy)]
struct Window {
    start: DateTime<Utc>,
    count: u32,
}

/// Per-key request windows held in a concurrent map.
#[derive(Debug)]
pub struct MemoryRateLimiter {
    windows: DashMap<String, Window>,
    policy: RateLimitPolicy,
    clock: Arc<dyn Clock>,
}

impl MemoryRateLimiter {
    #[must_use]
    pub fn new(policy: RateLimitPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            windows: DashMap::new(),
            policy,
            clock,
        }
    }
}

impl RateLimiter for MemoryRateLimiter {
    fn check_and_record(&self, key: &str, now: DateTime<Utc>) -> Result<RateDecision> {
        let window = span(self.policy.window);
        let count = match self.windows.entry(key.to_string()) {
            Entry::Occupied(mut held) => {
                let current = held.get_mut();
                if now - current.start >= window {
                    *current = Window { start: now, count: 1 };
                } else {
                    current.count = current.count.saturating_add(1);
                }
                current.count
            }
            Entry::Vacant(slot) => {
                slot.insert(Window { start: now, count: 1 });
                1
            }
        };

        Ok(RateDecision {
            allowed: count <= self.policy.limit,
            count,
        })
    }

    fn policy(&self) -> RateLimitPolicy {
        self.policy
    }
}

impl CleanableStore for MemoryRateLimiter {
    fn delete_expired(&self) -> Result<usize> {
        let now = self.clock.now();
        let window = span(self.policy.window);
        let before = self.windows.len();
        self.windows.retain(|_, w| now - w.start < window);
        Ok(before.saturating_sub(self.windows.len()))
    }

    fn store_name(&self) -> &'static str {
        "rate_limits"
    }
}
