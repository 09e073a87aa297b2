//! Paper-trading collaborators.
//!
//! A fixed-price quote provider and an executor that settles against an
//! in-process ledger. Used by the `simulate` command and for local runs
//! without a chain connection.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde_json::json;
use tracing::debug;

use crate::domain::{Balances, ExecutionReceipt, Quote, QuoteRequest, SubjectId};
use crate::error::{Error, Result};
use crate::port::outbound::balance::BalanceSource;
use crate::port::outbound::executor::{SigningContext, SwapExecutor, WalletDirectory};
use crate::port::outbound::quote::QuoteProvider;

/// Asset every paper wallet pays with.
pub const QUOTE_ASSET: &str = "USDC";

/// Simulated wallets. Every wallet starts with the same USDC balance.
#[derive(Debug)]
pub struct PaperLedger {
    wallets: DashMap<String, BTreeMap<String, Decimal>>,
    starting_balance: Decimal,
}

impl PaperLedger {
    #[must_use]
    pub fn new(starting_balance: Decimal) -> Self {
        Self {
            wallets: DashMap::new(),
            starting_balance,
        }
    }

    /// Current balances of `wallet`.
    ///
    /// # Errors
    ///
    /// Returns an error if the ledger holds a negative amount.
    pub fn balances(&self, wallet: &str) -> Result<Balances> {
        let amounts = self
            .wallets
            .get(wallet)
            .map(|w| w.value().clone())
            .unwrap_or_else(|| self.opening());
        Ok(Balances::try_new(amounts)?)
    }

    fn opening(&self) -> BTreeMap<String, Decimal> {
        BTreeMap::from([(QUOTE_ASSET.to_string(), self.starting_balance)])
    }

    /// Move `quote.input_amount` of the input asset into the output asset.
    fn settle(&self, wallet: &str, quote: &Quote) -> Result<()> {
        let mut entry = self
            .wallets
            .entry(wallet.to_string())
            .or_insert_with(|| self.opening());
        let amounts = entry.value_mut();
        let held = amounts
            .get(quote.input_asset())
            .copied()
            .unwrap_or(Decimal::ZERO);
        if held < quote.input_amount() {
            return Err(Error::Execution(format!(
                "insufficient {}: have {held}, need {}",
                quote.input_asset(),
                quote.input_amount()
            )));
        }
        amounts.insert(quote.input_asset().to_string(), held - quote.input_amount());
        *amounts
            .entry(quote.output_asset().to_string())
            .or_insert(Decimal::ZERO) += quote.output_amount();
        Ok(())
    }
}

/// Quotes every asset at one fixed USDC price.
pub struct PaperQuoteProvider {
    price: RwLock<Decimal>,
    slippage_tolerance_bps: u32,
}

impl PaperQuoteProvider {
    #[must_use]
    pub fn new(price: Decimal, slippage_tolerance_bps: u32) -> Self {
        Self {
            price: RwLock::new(price),
            slippage_tolerance_bps,
        }
    }

    /// Move the price; subsequent quotes use it.
    pub fn set_price(&self, price: Decimal) {
        *self.price.write() = price;
    }
}

#[async_trait]
impl QuoteProvider for PaperQuoteProvider {
    async fn get_quote(&self, request: &QuoteRequest) -> Result<Quote> {
        let price = *self.price.read();
        let input = request.amount() * price;
        let quote = Quote::try_new(
            QUOTE_ASSET,
            request.asset(),
            input,
            request.amount(),
            self.slippage_tolerance_bps,
        )
        .map_err(|e| Error::Quote(e.to_string()))?
        .with_route(json!({ "venue": "paper", "price": price.to_string() }));
        Ok(quote)
    }

    fn provider_name(&self) -> &'static str {
        "paper"
    }
}

/// Settles confirmed quotes against a [`PaperLedger`].
pub struct PaperExecutor {
    ledger: Arc<PaperLedger>,
    latency: Duration,
    sequence: AtomicU64,
}

impl PaperExecutor {
    #[must_use]
    pub fn new(ledger: Arc<PaperLedger>, latency: Duration) -> Self {
        Self {
            ledger,
            latency,
            sequence: AtomicU64::new(0),
        }
    }
}

#[async_trait]
impl SwapExecutor for PaperExecutor {
    async fn execute(&self, quote: &Quote, context: &SigningContext) -> Result<ExecutionReceipt> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.ledger.settle(&context.wallet_address, quote)?;
        let n = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(wallet = %context.wallet_address, n, "Paper swap settled");
        Ok(ExecutionReceipt {
            tx_id: format!("paper-{n:06}"),
            confirmed: true,
        })
    }

    fn executor_name(&self) -> &'static str {
        "paper"
    }
}

/// Reads balances from a [`PaperLedger`].
pub struct PaperBalanceSource {
    ledger: Arc<PaperLedger>,
}

impl PaperBalanceSource {
    #[must_use]
    pub fn new(ledger: Arc<PaperLedger>) -> Self {
        Self { ledger }
    }
}

#[async_trait]
impl BalanceSource for PaperBalanceSource {
    async fn get_all_balances(&self, subject_key: &str) -> Result<Balances> {
        self.ledger.balances(subject_key)
    }
}

/// Gives every subject the wallet `paper-<subject>`.
#[derive(Debug, Default)]
pub struct PaperWalletDirectory;

#[async_trait]
impl WalletDirectory for PaperWalletDirectory {
    async fn signing_context(&self, subject_id: &SubjectId) -> Result<SigningContext> {
        Ok(SigningContext {
            subject_id: subject_id.clone(),
            wallet_address: format!("paper-{subject_id}"),
            key_ref: format!("paper://{subject_id}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ConfirmationKind;
    use rust_decimal_macros::dec;

    fn request(amount: Decimal) -> QuoteRequest {
        QuoteRequest::try_new(
            SubjectId::new("u1"),
            ConfirmationKind::SwapExecute,
            amount,
            "SOL",
        )
        .unwrap()
    }

    #[tokio::test]
    async fn quotes_at_fixed_price() {
        let provider = PaperQuoteProvider::new(dec!(150), 50);
        let quote = provider.get_quote(&request(dec!(0.5))).await.unwrap();

        assert_eq!(quote.input_amount(), dec!(75.0));
        assert_eq!(quote.output_amount(), dec!(0.5));
        assert_eq!(quote.slippage_tolerance_bps(), 50);
    }

    #[tokio::test]
    async fn executor_moves_funds() {
        let ledger = Arc::new(PaperLedger::new(dec!(100)));
        let executor = PaperExecutor::new(Arc::clone(&ledger), Duration::ZERO);
        let context = PaperWalletDirectory
            .signing_context(&SubjectId::new("u1"))
            .await
            .unwrap();
        let quote = PaperQuoteProvider::new(dec!(150), 50)
            .get_quote(&request(dec!(0.5)))
            .await
            .unwrap();

        let receipt = executor.execute(&quote, &context).await.unwrap();
        let balances = ledger.balances(&context.wallet_address).unwrap();

        assert_eq!(receipt.tx_id, "paper-000001");
        assert_eq!(balances.amount("USDC"), dec!(25));
        assert_eq!(balances.amount("SOL"), dec!(0.5));
    }

    #[tokio::test]
    async fn executor_rejects_overdraft() {
        let ledger = Arc::new(PaperLedger::new(dec!(10)));
        let executor = PaperExecutor::new(Arc::clone(&ledger), Duration::ZERO);
        let context = PaperWalletDirectory
            .signing_context(&SubjectId::new("u1"))
            .await
            .unwrap();
        let quote = PaperQuoteProvider::new(dec!(150), 50)
            .get_quote(&request(dec!(0.5)))
            .await
            .unwrap();

        assert!(executor.execute(&quote, &context).await.is_err());
        assert_eq!(
            ledger.balances(&context.wallet_address).unwrap().amount("USDC"),
            dec!(10)
        );
    }
}
