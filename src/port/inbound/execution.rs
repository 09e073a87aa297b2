//! Inbound contract consumed by the presentation layer (chat bot, HTTP, CLI).

use async_trait::async_trait;

use crate::domain::{
    ConfirmationSession, ConfirmationTicket, ExecutionOutcome, QuoteRequest, SessionId,
};
use crate::error::PipelineError;

/// Confirm-then-execute service.
#[async_trait]
pub trait ConfirmationService: Send + Sync {
    /// Quote the request and open a confirmation session for it.
    async fn open_confirmation(
        &self,
        request: QuoteRequest,
    ) -> Result<ConfirmationTicket, PipelineError>;

    /// Read a session for rendering a confirmation prompt, without consuming it.
    fn preview(&self, session_id: &SessionId) -> Result<Option<ConfirmationSession>, PipelineError>;

    /// Execute a confirmed session at most once.
    async fn execute(&self, session_id: &SessionId) -> Result<ExecutionOutcome, PipelineError>;

    /// Abandon a session. Returns whether one was removed.
    fn cancel(&self, session_id: &SessionId) -> Result<bool, PipelineError>;

    /// Session lifetime for user messaging.
    fn ttl_seconds(&self) -> u64;
}
