//! Operation classes, lock keys and leases.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{LeaseToken, SubjectId};

/// Class of balance-affecting operation.
///
/// Locks are keyed by subject and class; different classes never contend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationClass {
    /// A single swap submission.
    Swap,
    /// A longer window in which balances are being moved (portfolio buys).
    BalanceMutation,
    /// Wallet provisioning.
    WalletCreate,
}

impl OperationClass {
    /// Stable name used in lock keys and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Swap => "swap",
            Self::BalanceMutation => "balance_mutation",
            Self::WalletCreate => "wallet_create",
        }
    }
}

impl fmt::Display for OperationClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "swap" => Ok(Self::Swap),
            "balance_mutation" => Ok(Self::BalanceMutation),
            "wallet_create" => Ok(Self::WalletCreate),
            other => Err(format!("unknown operation class: {other}")),
        }
    }
}

/// Composite lock key: subject plus operation class.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LockKey {
    subject_id: SubjectId,
    class: OperationClass,
}

impl LockKey {
    #[must_use]
    pub const fn new(subject_id: SubjectId, class: OperationClass) -> Self {
        Self { subject_id, class }
    }

    #[must_use]
    pub const fn subject_id(&self) -> &SubjectId {
        &self.subject_id
    }

    #[must_use]
    pub const fn class(&self) -> OperationClass {
        self.class
    }

    /// Flat storage key, e.g. `user-1:swap`.
    #[must_use]
    pub fn storage_key(&self) -> String {
        format!("{}:{}", self.subject_id, self.class)
    }
}

impl fmt::Display for LockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.subject_id, self.class)
    }
}

/// A live lock lease.
///
/// Holding a `Lease` is the only way to release the lock it describes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lease {
    pub key: LockKey,
    pub token: LeaseToken,
    pub acquired_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Lease {
    /// True while `now - acquired_at < ttl`.
    #[must_use]
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}
