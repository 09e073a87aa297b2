//! Executor and wallet ports.
//!
//! These are the integration points for signing and submitting
//! transactions. The core treats both as opaque.

use async_trait::async_trait;

use crate::domain::{ExecutionReceipt, Quote, SubjectId};
use crate::error::Result;

/// What the executor needs to sign on behalf of a subject.
#[derive(Clone, PartialEq, Eq)]
pub struct SigningContext {
    pub subject_id: SubjectId,
    /// Wallet address; also the balance cache key.
    pub wallet_address: String,
    /// Opaque handle to key material held by the wallet service.
    pub key_ref: String,
}

impl std::fmt::Debug for SigningContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningContext")
            .field("subject_id", &self.subject_id)
            .field("wallet_address", &self.wallet_address)
            .field("key_ref", &"<redacted>")
            .finish()
    }
}

/// Signs and submits a confirmed quote.
#[async_trait]
pub trait SwapExecutor: Send + Sync {
    async fn execute(&self, quote: &Quote, context: &SigningContext) -> Result<ExecutionReceipt>;

    /// Executor name for logging.
    fn executor_name(&self) -> &'static str;
}

/// Resolves the signing context for a subject.
#[async_trait]
pub trait WalletDirectory: Send + Sync {
    async fn signing_context(&self, subject_id: &SubjectId) -> Result<SigningContext>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_key_ref() {
        let ctx = SigningContext {
            subject_id: SubjectId::new("u1"),
            wallet_address: "So1Wallet".into(),
            key_ref: "vault://keys/u1".into(),
        };
        let debug = format!("{ctx:?}");
        assert!(debug.contains("So1Wallet"));
        assert!(!debug.contains("vault://"));
    }
}
