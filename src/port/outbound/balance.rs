//! Balance source port.

use async_trait::async_trait;

use crate::domain::Balances;
use crate::error::Result;

/// Fetches every asset balance for a wallet in one batched round trip.
#[async_trait]
pub trait BalanceSource: Send + Sync {
    async fn get_all_balances(&self, subject_key: &str) -> Result<Balances>;
}
