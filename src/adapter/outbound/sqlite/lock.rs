//! SQLite operation lock.

use std::sync::Arc;
use std::time::Duration;

use diesel::prelude::*;

use super::database::connection::{checkout, DbPool};
use super::database::model::{to_millis, LockRow};
use super::database::schema::operation_locks::dsl;
use crate::domain::{Lease, LeaseToken, LockKey};
use crate::error::Result;
use crate::port::outbound::clock::{span, Clock};
use crate::port::outbound::store::{CleanableStore, OperationLock};

/// Leases persisted in SQLite, one row per lock key.
pub struct SqliteOperationLock {
    pool: DbPool,
    clock: Arc<dyn Clock>,
}

impl SqliteOperationLock {
    #[must_use]
    pub fn new(pool: DbPool, clock: Arc<dyn Clock>) -> Self {
        Self { pool, clock }
    }
}

impl OperationLock for SqliteOperationLock {
    fn try_acquire(&self, key: &LockKey, ttl: Duration) -> Result<Option<Lease>> {
        let now = self.clock.now();
        let lease = Lease {
            key: key.clone(),
            token: LeaseToken::new(),
            acquired_at: now,
            expires_at: now + span(ttl),
        };
        let row = LockRow {
            lock_key: key.storage_key(),
            token: lease.token.as_str().to_string(),
            acquired_at: to_millis(lease.acquired_at),
            expires_at: to_millis(lease.expires_at),
        };

        let mut conn = checkout(&self.pool)?;
        let inserted = conn.immediate_transaction(|conn| {
            diesel::delete(
                dsl::operation_locks
                    .filter(dsl::lock_key.eq(row.lock_key.as_str()))
                    .filter(dsl::expires_at.le(row.acquired_at)),
            )
            .execute(conn)?;
            diesel::insert_or_ignore_into(dsl::operation_locks)
                .values(&row)
                .execute(conn)
        })?;

        Ok((inserted == 1).then_some(lease))
    }

    fn release(&self, lease: &Lease) -> Result<bool> {
        let mut conn = checkout(&self.pool)?;
        let deleted = diesel::delete(
            dsl::operation_locks
                .filter(dsl::lock_key.eq(lease.key.storage_key()))
                .filter(dsl::token.eq(lease.token.as_str())),
        )
        .execute(&mut conn)?;
        Ok(deleted > 0)
    }
}

impl CleanableStore for SqliteOperationLock {
    fn delete_expired(&self) -> Result<usize> {
        let now = to_millis(self.clock.now());
        let mut conn = checkout(&self.pool)?;
        Ok(diesel::delete(dsl::operation_locks.filter(dsl::expires_at.le(now)))
            .execute(&mut conn)?)
    }

    fn store_name(&self) -> &'static str {
        "operation_locks"
    }
}
