//! SQLite fixed-window rate limiter.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::result::Error as DieselError;

use super::database::connection::{checkout, DbPool};
use super::database::model::{to_millis, RateWindowRow};
use super::database::schema::rate_limit_windows::dsl;
use crate::error::Result;
use crate::port::outbound::clock::{span, Clock};
use crate::port::outbound::store::{CleanableStore, RateDecision, RateLimitPolicy, RateLimiter};

/// Request windows persisted in SQLite, one row per key.
pub struct SqliteRateLimiter {
    pool: DbPool,
    policy: RateLimitPolicy,
    clock: Arc<dyn Clock>,
}

impl SqliteRateLimiter {
    #[must_use]
    pub fn new(pool: DbPool, policy: RateLimitPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            pool,
            policy,
            clock,
        }
    }

    fn window_millis(&self) -> i64 {
        span(self.policy.window).num_milliseconds()
    }
}

impl RateLimiter for SqliteRateLimiter {
    fn check_and_record(&self, key: &str, now: DateTime<Utc>) -> Result<RateDecision> {
        let now = to_millis(now);
        let window = self.window_millis();
        let mut conn = checkout(&self.pool)?;

        let count = conn.immediate_transaction(|conn| {
            let current: Option<RateWindowRow> = dsl::rate_limit_windows
                .find(key)
                .first(conn)
                .optional()?;
            let next = match current {
                Some(row) if now - row.window_start < window => RateWindowRow {
                    count: row.count.saturating_add(1),
                    ..row
                },
                _ => RateWindowRow {
                    rate_key: key.to_string(),
                    window_start: now,
                    count: 1,
                },
            };
            diesel::replace_into(dsl::rate_limit_windows)
                .values(&next)
                .execute(conn)?;
            Ok::<_, DieselError>(next.count)
        })?;

        let count = u32::try_from(count).unwrap_or(u32::MAX);
        Ok(RateDecision {
            allowed: count <= self.policy.limit,
            count,
        })
    }

    fn policy(&self) -> RateLimitPolicy {
        self.policy
    }
}

impl CleanableStore for SqliteRateLimiter {
    fn delete_expired(&self) -> Result<usize> {
        let cutoff = to_millis(self.clock.now()) - self.window_millis();
        let mut conn = checkout(&self.pool)?;
        Ok(
            diesel::delete(dsl::rate_limit_windows.filter(dsl::window_start.le(cutoff)))
                .execute(&mut conn)?,
        )
    }

    fn store_name(&self) -> &'static str {
        "rate_limits"
    }
}
