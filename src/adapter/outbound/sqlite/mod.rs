//! SQLite persistence adapters.
//!
//! Store implementations shared by every process pointing at the same
//! database file. Check-and-act operations run inside `BEGIN IMMEDIATE`
//! transactions or as single conditional statements, so they stay atomic
//! across processes as well as threads.

pub mod confirmation;
pub mod database;
pub mod lock;
pub mod rate_limit;

pub use confirmation::SqliteConfirmationStore;
pub use database::connection::{create_pool, run_migrations, DbPool};
pub use lock::SqliteOperationLock;
pub use rate_limit::SqliteRateLimiter;
