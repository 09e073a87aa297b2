//! Database model types for Diesel ORM.
//!
//! Timestamps are stored as Unix milliseconds so expiry checks compare
//! integers inside SQL.

use chrono::{DateTime, TimeZone, Utc};
use diesel::prelude::*;

use super::schema::{confirmation_sessions, operation_locks, rate_limit_windows};
use crate::error::{Error, Result};

/// Database row for a confirmation session.
#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = confirmation_sessions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ConfirmationRow {
    pub session_id: String,
    pub subject_id: String,
    pub kind: String,
    pub amount: String,
    pub asset: String,
    pub quote_json: String,
    pub created_at: i64,
    pub expires_at: i64,
    pub reconfirm_count: i32,
}

/// Database row for an operation lock lease.
#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = operation_locks)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct LockRow {
    pub lock_key: String,
    pub token: String,
    pub acquired_at: i64,
    pub expires_at: i64,
}

/// Database row for a rate limit window.
#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = rate_limit_windows)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct RateWindowRow {
    pub rate_key: String,
    pub window_start: i64,
    pub count: i32,
}

/// Convert a timestamp to its stored form.
pub fn to_millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

/// Convert a stored timestamp back.
///
/// # Errors
///
/// Returns [`Error::Database`] for values outside chrono's range.
pub fn from_millis(millis: i64) -> Result<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| Error::Database(format!("invalid stored timestamp: {millis}")))
}
