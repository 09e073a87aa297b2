//! Builders for domain primitives used across tests.
//!
//! Concise factories for quotes, requests and drafts so tests focus on
//! assertions rather than construction boilerplate.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::domain::{
    ConfirmationDraft, ConfirmationKind, LockKey, OperationClass, Quote, QuoteRequest, SubjectId,
};

/// Default tolerance carried by test quotes.
pub const TOLERANCE_BPS: u32 = 50;

/// Create a [`SubjectId`] from a string.
pub fn subject(id: &str) -> SubjectId {
    SubjectId::new(id)
}

/// A USDC to SOL quote with the given output and the default tolerance.
pub fn quote(output: Decimal) -> Quote {
    quote_with_tolerance(output, TOLERANCE_BPS)
}

/// A USDC to SOL quote with an explicit tolerance.
pub fn quote_with_tolerance(output: Decimal, tolerance_bps: u32) -> Quote {
    Quote::try_new("USDC", "SOL", dec!(75), output, tolerance_bps)
        .expect("test quote must be valid")
}

/// A swap request for 0.5 SOL.
pub fn swap_request(subject_id: &str) -> QuoteRequest {
    request(subject_id, ConfirmationKind::SwapExecute)
}

/// A request of the given kind for 0.5 SOL.
pub fn request(subject_id: &str, kind: ConfirmationKind) -> QuoteRequest {
    QuoteRequest::try_new(subject(subject_id), kind, dec!(0.5), "SOL")
        .expect("test request must be valid")
}

/// A swap draft quoting 100 units of output.
pub fn draft(subject_id: &str) -> ConfirmationDraft {
    ConfirmationDraft::new(&swap_request(subject_id), quote(dec!(100)))
}

/// Lock key for a subject's swap class.
pub fn swap_lock(subject_id: &str) -> LockKey {
    LockKey::new(subject(subject_id), OperationClass::Swap)
}
