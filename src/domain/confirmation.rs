//! Confirmation sessions.
//!
//! A session records a user's approval of one specific quote. It is
//! short-lived, may be refreshed with a new quote a bounded number of times,
//! and is consumed at most once.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{SessionId, SubjectId};
use super::operation::OperationClass;
use super::quote::{Quote, QuoteRequest};

/// Purpose of a confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationKind {
    /// Buy into the configured portfolio allocation.
    PortfolioBuy,
    /// Execute a single swap.
    SwapExecute,
}

impl ConfirmationKind {
    /// Stable name used in storage and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PortfolioBuy => "portfolio_buy",
            Self::SwapExecute => "swap_execute",
        }
    }

    /// Operation class whose lock guards execution of this kind.
    #[must_use]
    pub const fn operation_class(self) -> OperationClass {
        match self {
            Self::PortfolioBuy => OperationClass::BalanceMutation,
            Self::SwapExecute => OperationClass::Swap,
        }
    }
}

impl fmt::Display for ConfirmationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConfirmationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "portfolio_buy" => Ok(Self::PortfolioBuy),
            "swap_execute" => Ok(Self::SwapExecute),
            other => Err(format!("unknown confirmation kind: {other}")),
        }
    }
}

/// Everything needed to open a session, minus the id and timestamps the
/// store assigns.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfirmationDraft {
    pub subject_id: SubjectId,
    pub kind: ConfirmationKind,
    pub amount: Decimal,
    pub asset: String,
    pub quote: Quote,
}

impl ConfirmationDraft {
    /// Build a draft from a validated request and the quote it produced.
    #[must_use]
    pub fn new(request: &QuoteRequest, quote: Quote) -> Self {
        Self {
            subject_id: request.subject_id().clone(),
            kind: request.kind(),
            amount: request.amount(),
            asset: request.asset().to_string(),
            quote,
        }
    }
}

/// A stored confirmation session.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfirmationSession {
    pub session_id: SessionId,
    pub subject_id: SubjectId,
    pub kind: ConfirmationKind,
    pub amount: Decimal,
    pub asset: String,
    /// The currently approved quote.
    pub quote: Quote,
    pub created_at: DateTime<Utc>,
    /// Reset on each successful re-confirmation.
    pub expires_at: DateTime<Utc>,
    /// Number of times the quote has been refreshed.
    pub reconfirm_count: u32,
}

impl ConfirmationSession {
    /// Materialize a draft into a session.
    #[must_use]
    pub fn from_draft(
        session_id: SessionId,
        draft: ConfirmationDraft,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            session_id,
            subject_id: draft.subject_id,
            kind: draft.kind,
            amount: draft.amount,
            asset: draft.asset,
            quote: draft.quote,
            created_at,
            expires_at,
            reconfirm_count: 0,
        }
    }

    /// True while `now < expires_at`.
    #[must_use]
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn kind_round_trips_through_str() {
        for kind in [ConfirmationKind::PortfolioBuy, ConfirmationKind::SwapExecute] {
            assert_eq!(kind.as_str().parse::<ConfirmationKind>(), Ok(kind));
        }
        assert!("withdraw".parse::<ConfirmationKind>().is_err());
    }

    #[test]
    fn kinds_map_to_lock_classes() {
        assert_eq!(
            ConfirmationKind::SwapExecute.operation_class(),
            OperationClass::Swap
        );
        assert_eq!(
            ConfirmationKind::PortfolioBuy.operation_class(),
            OperationClass::BalanceMutation
        );
    }

    #[test]
    fn session_is_live_strictly_before_expiry() {
        let now = Utc::now();
        let quote = Quote::try_new("USDC", "SOL", dec!(75), dec!(0.5), 50).unwrap();
        let draft = ConfirmationDraft {
            subject_id: SubjectId::new("u1"),
            kind: ConfirmationKind::SwapExecute,
            amount: dec!(0.5),
            asset: "SOL".into(),
            quote,
        };
        let session = ConfirmationSession::from_draft(
            SessionId::generate(),
            draft,
            now,
            now + chrono::Duration::seconds(60),
        );

        assert_eq!(session.reconfirm_count, 0);
        assert!(session.is_live(now));
        assert!(!session.is_live(session.expires_at));
    }
}
