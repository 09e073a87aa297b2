//! Balance snapshots.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::DomainError;

/// Snapshot of multiple asset amounts held by one wallet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balances(BTreeMap<String, Decimal>);

impl Balances {
    /// Create a validated snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::NegativeBalance`] if any amount is below zero.
    pub fn try_new(amounts: BTreeMap<String, Decimal>) -> Result<Self, DomainError> {
        if let Some((asset, amount)) = amounts.iter().find(|(_, a)| **a < Decimal::ZERO) {
            return Err(DomainError::NegativeBalance {
                asset: asset.clone(),
                amount: *amount,
            });
        }
        Ok(Self(amounts))
    }

    /// Amount held for `asset`; zero when the wallet has none.
    #[must_use]
    pub fn amount(&self, asset: &str) -> Decimal {
        self.0.get(asset).copied().unwrap_or(Decimal::ZERO)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Decimal)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, Decimal)> for Balances {
    /// Unchecked construction for trusted literals; prefer [`Balances::try_new`]
    /// for data from a balance source.
    fn from_iter<I: IntoIterator<Item = (S, Decimal)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}
