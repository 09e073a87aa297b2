//! Domain validation errors for core domain types.
//!
//! This module defines errors that occur when domain invariants are violated.
//! These errors are returned by `try_new` constructors that validate inputs.
//!
//! # Examples
//!
//! ```
//! use swapguard::domain::error::DomainError;
//! use swapguard::domain::quote::Quote;
//! use rust_decimal_macros::dec;
//!
//! // A quote that promises nothing cannot anchor a slippage check.
//! let result = Quote::try_new("USDC", "SOL", dec!(75), dec!(0), 50);
//! assert!(matches!(result, Err(DomainError::NonPositiveOutput { .. })));
//! ```

use rust_decimal::Decimal;
use thiserror::Error;

/// Errors that occur when domain invariants are violated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Requested amounts must be positive.
    #[error("amount must be positive, got {amount}")]
    NonPositiveAmount {
        /// The invalid amount that was provided.
        amount: Decimal,
    },

    /// Asset symbols cannot be blank.
    #[error("asset cannot be empty")]
    EmptyAsset,

    /// Quotes must promise a positive output amount.
    #[error("quote output must be positive, got {output}")]
    NonPositiveOutput {
        /// The invalid output amount.
        output: Decimal,
    },

    /// Balances are plain non-negative quantities.
    #[error("balance for {asset} must not be negative, got {amount}")]
    NegativeBalance {
        /// Asset whose balance was negative.
        asset: String,
        /// The invalid amount.
        amount: Decimal,
    },
}
