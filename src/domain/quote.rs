//! Quotes and quote requests.
//!
//! A [`Quote`] is the snapshot of price and terms a user approves. The core
//! never prices anything itself; it only compares quotes issued by a
//! [`QuoteProvider`](crate::port::outbound::quote::QuoteProvider).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::confirmation::ConfirmationKind;
use super::error::DomainError;
use super::id::SubjectId;

/// Price and terms returned by a quote provider.
///
/// The slippage tolerance travels with the quote so that different
/// operation kinds can carry different tolerances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    input_asset: String,
    output_asset: String,
    input_amount: Decimal,
    output_amount: Decimal,
    slippage_tolerance_bps: u32,
    /// Provider-specific payload (route plan, pool ids, ...). Opaque to the core.
    #[serde(default)]
    route: serde_json::Value,
}

impl Quote {
    /// Create a validated quote.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::NonPositiveOutput`] when `output_amount <= 0`
    /// and [`DomainError::NonPositiveAmount`] when `input_amount <= 0`.
    pub fn try_new(
        input_asset: impl Into<String>,
        output_asset: impl Into<String>,
        input_amount: Decimal,
        output_amount: Decimal,
        slippage_tolerance_bps: u32,
    ) -> Result<Self, DomainError> {
        if input_amount <= Decimal::ZERO {
            return Err(DomainError::NonPositiveAmount {
                amount: input_amount,
            });
        }
        if output_amount <= Decimal::ZERO {
            return Err(DomainError::NonPositiveOutput {
                output: output_amount,
            });
        }
        Ok(Self {
            input_asset: input_asset.into(),
            output_asset: output_asset.into(),
            input_amount,
            output_amount,
            slippage_tolerance_bps,
            route: serde_json::Value::Null,
        })
    }

    /// Attach an opaque provider payload.
    #[must_use]
    pub fn with_route(mut self, route: serde_json::Value) -> Self {
        self.route = route;
        self
    }

    /// Re-check invariants on a quote that did not come through `try_new`
    /// (e.g. deserialized from a provider response).
    ///
    /// # Errors
    ///
    /// Same as [`Quote::try_new`].
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.input_amount <= Decimal::ZERO {
            return Err(DomainError::NonPositiveAmount {
                amount: self.input_amount,
            });
        }
        if self.output_amount <= Decimal::ZERO {
            return Err(DomainError::NonPositiveOutput {
                output: self.output_amount,
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn input_asset(&self) -> &str {
        &self.input_asset
    }

    #[must_use]
    pub fn output_asset(&self) -> &str {
        &self.output_asset
    }

    #[must_use]
    pub const fn input_amount(&self) -> Decimal {
        self.input_amount
    }

    #[must_use]
    pub const fn output_amount(&self) -> Decimal {
        self.output_amount
    }

    /// Allowed price movement in basis points (1 bps = 0.01%).
    #[must_use]
    pub const fn slippage_tolerance_bps(&self) -> u32 {
        self.slippage_tolerance_bps
    }

    #[must_use]
    pub const fn route(&self) -> &serde_json::Value {
        &self.route
    }
}

/// Parameters a caller asks to have quoted and confirmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteRequest {
    subject_id: SubjectId,
    kind: ConfirmationKind,
    amount: Decimal,
    asset: String,
}

impl QuoteRequest {
    /// Create a validated request.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::NonPositiveAmount`] or [`DomainError::EmptyAsset`].
    pub fn try_new(
        subject_id: SubjectId,
        kind: ConfirmationKind,
        amount: Decimal,
        asset: impl Into<String>,
    ) -> Result<Self, DomainError> {
        let asset = asset.into();
        if amount <= Decimal::ZERO {
            return Err(DomainError::NonPositiveAmount { amount });
        }
        if asset.trim().is_empty() {
            return Err(DomainError::EmptyAsset);
        }
        Ok(Self {
            subject_id,
            kind,
            amount,
            asset,
        })
    }

    #[must_use]
    pub const fn subject_id(&self) -> &SubjectId {
        &self.subject_id
    }

    #[must_use]
    pub const fn kind(&self) -> ConfirmationKind {
        self.kind
    }

    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.amount
    }

    #[must_use]
    pub fn asset(&self) -> &str {
        &self.asset
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn quote_rejects_zero_output() {
        let result = Quote::try_new("USDC", "SOL", dec!(75), Decimal::ZERO, 50);
        assert_eq!(
            result,
            Err(DomainError::NonPositiveOutput {
                output: Decimal::ZERO
            })
        );
    }

    #[test]
    fn quote_rejects_non_positive_input() {
        let result = Quote::try_new("USDC", "SOL", dec!(-1), dec!(1), 50);
        assert!(matches!(result, Err(DomainError::NonPositiveAmount { .. })));
    }

    #[test]
    fn quote_keeps_route_payload() {
        let quote = Quote::try_new("USDC", "SOL", dec!(75), dec!(0.5), 50)
            .unwrap()
            .with_route(serde_json::json!({"pool": "abc"}));
        assert_eq!(quote.route()["pool"], "abc");
        assert_eq!(quote.slippage_tolerance_bps(), 50);
    }

    #[test]
    fn validate_catches_deserialized_zero_output() {
        let json = r#"{"input_asset":"USDC","output_asset":"SOL","input_amount":"1","output_amount":"0","slippage_tolerance_bps":50}"#;
        let quote: Quote = serde_json::from_str(json).unwrap();
        assert!(quote.validate().is_err());
    }

    #[test]
    fn request_rejects_blank_asset() {
        let result = QuoteRequest::try_new(
            SubjectId::new("u1"),
            ConfirmationKind::SwapExecute,
            dec!(1),
            "  ",
        );
        assert_eq!(result, Err(DomainError::EmptyAsset));
    }

    #[test]
    fn request_rejects_zero_amount() {
        let result = QuoteRequest::try_new(
            SubjectId::new("u1"),
            ConfirmationKind::SwapExecute,
            Decimal::ZERO,
            "SOL",
        );
        assert!(matches!(result, Err(DomainError::NonPositiveAmount { .. })));
    }
}
