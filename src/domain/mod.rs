//! Exchange-agnostic domain types.

pub mod balance;
pub mod confirmation;
pub mod error;
pub mod execution;
pub mod id;
pub mod operation;
pub mod quote;

pub use balance::Balances;
pub use confirmation::{ConfirmationDraft, ConfirmationKind, ConfirmationSession};
pub use error::DomainError;
pub use execution::{
    ConfirmationTicket, ExecutionOutcome, ExecutionReceipt, ExecutionStage, Reconfirmation,
    Settlement,
};
pub use id::{LeaseToken, SessionId, SubjectId};
pub use operation::{Lease, LockKey, OperationClass};
pub use quote::{Quote, QuoteRequest};
