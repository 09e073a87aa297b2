//! Execution lifecycle and results.
//!
//! The lifecycle of a confirmation is a small state machine:
//!
//! ```text
//! Quoted -> ConfirmedPending -> (Reconfirming -> ConfirmedPending)* -> LockedExecuting -> Succeeded | Failed
//!                  \                    \
//!                   +-> Expired          +-> Expired
//!                   +-> Cancelled        +-> Cancelled
//! ```

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::id::{SessionId, SubjectId};
use super::quote::Quote;

/// Stage of a confirmation in the execution lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutionStage {
    /// A quote was fetched but nothing is stored yet.
    Quoted,
    /// The session is stored and waiting for the caller to execute it.
    ConfirmedPending,
    /// The price moved; the session carries a fresh quote awaiting re-approval.
    Reconfirming,
    /// The session was consumed and the subject's lock is held.
    LockedExecuting,
    /// The executor settled the swap.
    Succeeded,
    /// The executor failed or timed out.
    Failed,
    /// The session is gone (expired, replayed, or lost to a concurrent caller).
    Expired,
    /// The session was cancelled by the caller or by the reconfirm cap.
    Cancelled,
}

impl ExecutionStage {
    /// Stable name used in events and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Quoted => "quoted",
            Self::ConfirmedPending => "confirmed_pending",
            Self::Reconfirming => "reconfirming",
            Self::LockedExecuting => "locked_executing",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Expired => "expired",
            Self::Cancelled => "cancelled",
        }
    }

    /// True for stages with no outgoing transitions.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Succeeded | Self::Failed | Self::Expired | Self::Cancelled
        )
    }

    /// Whether the lifecycle permits moving from `self` to `next`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        use ExecutionStage::*;
        matches!(
            (self, next),
            (Quoted, ConfirmedPending)
                | (ConfirmedPending, Reconfirming)
                | (ConfirmedPending, LockedExecuting)
                | (ConfirmedPending, Expired)
                | (ConfirmedPending, Cancelled)
                | (Reconfirming, ConfirmedPending)
                | (Reconfirming, Expired)
                | (Reconfirming, Cancelled)
                | (LockedExecuting, Succeeded)
                | (LockedExecuting, Failed)
        )
    }
}

impl fmt::Display for ExecutionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receipt returned by the executor for a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionReceipt {
    pub tx_id: String,
    /// Whether the transaction was confirmed on-chain before returning.
    pub confirmed: bool,
}

/// Handle returned when a confirmation is opened.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfirmationTicket {
    pub session_id: SessionId,
    pub quote: Quote,
    pub expires_at: DateTime<Utc>,
}

/// Settlement details for a successful execution.
#[derive(Debug, Clone, PartialEq)]
pub struct Settlement {
    pub session_id: SessionId,
    pub subject_id: SubjectId,
    pub tx_id: String,
    pub confirmed: bool,
    /// The quote the caller approved and the executor was given.
    pub quote: Quote,
}

/// The price moved beyond tolerance; the caller must re-approve.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconfirmation {
    /// Same id as before; the session now carries `fresh`.
    pub session_id: SessionId,
    pub original: Quote,
    pub fresh: Quote,
    /// Observed movement in basis points.
    pub moved_bps: Decimal,
    pub expires_at: DateTime<Utc>,
    /// Refreshes still allowed after this one.
    pub reconfirms_remaining: u32,
}

/// Non-error result of [`execute`](crate::port::inbound::execution::ConfirmationService::execute).
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
    /// The swap was executed.
    Settled(Settlement),
    /// The swap was not executed; a fresh quote awaits approval.
    ReconfirmRequired(Reconfirmation),
}

impl ExecutionOutcome {
    #[must_use]
    pub const fn is_settled(&self) -> bool {
        matches!(self, Self::Settled(_))
    }

    #[must_use]
    pub const fn settlement(&self) -> Option<&Settlement> {
        match self {
            Self::Settled(s) => Some(s),
            Self::ReconfirmRequired(_) => None,
        }
    }
}
