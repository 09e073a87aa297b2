//! Notifier port for pipeline events.
//!
//! This module defines the trait for observing confirmation lifecycle
//! transitions, execution results and rejections.

use crate::domain::{ConfirmationKind, ExecutionStage, SessionId, SubjectId};
use crate::error::PipelineError;

/// Events that can trigger notifications.
#[derive(Debug, Clone)]
pub enum Event {
    /// A confirmation moved to a new lifecycle stage.
    StageChanged(StageEvent),
    /// Execution completed (success or failure).
    ExecutionCompleted(ExecutionEvent),
    /// A request was rejected before reaching the executor.
    Rejected(RejectionEvent),
}

/// Lifecycle transition event.
#[derive(Debug, Clone)]
pub struct StageEvent {
    pub session_id: SessionId,
    pub subject_id: SubjectId,
    pub kind: ConfirmationKind,
    pub stage: ExecutionStage,
}

/// Execution result event.
#[derive(Debug, Clone)]
pub struct ExecutionEvent {
    pub session_id: SessionId,
    pub subject_id: SubjectId,
    /// Whether the execution was successful.
    pub success: bool,
    /// Transaction id or failure detail.
    pub details: String,
}

/// Rejection event.
#[derive(Debug, Clone)]
pub struct RejectionEvent {
    /// Unknown when the session could not be found.
    pub subject_id: Option<SubjectId>,
    /// Stable category, see [`PipelineError::code`].
    pub code: &'static str,
    /// Internal reason; not meant for end users.
    pub reason: String,
}

impl RejectionEvent {
    /// Create a rejection event from a pipeline error.
    #[must_use]
    pub fn new(subject_id: Option<&SubjectId>, error: &PipelineError) -> Self {
        Self {
            subject_id: subject_id.cloned(),
            code: error.code(),
            reason: error.to_string(),
        }
    }
}

/// Trait for notification handlers.
///
/// Notifications are fire-and-forget.
///
/// # Implementation Notes
///
/// - Implementations must be thread-safe (`Send + Sync`)
/// - The `notify` method should not block or perform slow I/O synchronously
pub trait Notifier: Send + Sync {
    fn notify(&self, event: Event);
}

/// Registry of notifiers (composite pattern).
///
/// Broadcasts events to all registered notifiers.
pub struct NotifierRegistry {
    notifiers: Vec<Box<dyn Notifier>>,
}

impl NotifierRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self { notifiers: vec![] }
    }

    /// Register a notifier.
    pub fn register(&mut self, notifier: Box<dyn Notifier>) {
        self.notifiers.push(notifier);
    }

    /// Notify all registered notifiers.
    pub fn notify_all(&self, event: Event) {
        for notifier in &self.notifiers {
            notifier.notify(event.clone());
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.notifiers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.notifiers.is_empty()
    }
}

impl Default for NotifierRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// A no-op notifier for when notifications are disabled.
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _event: Event) {}
}

/// A logging notifier that logs events via tracing.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, event: Event) {
        use tracing::{debug, info, warn};
        match event {
            Event::StageChanged(e) => {
                debug!(
                    session = %e.session_id.short(),
                    subject = %e.subject_id,
                    kind = %e.kind,
                    stage = %e.stage,
                    "Confirmation stage changed"
                );
            }
            Event::ExecutionCompleted(e) => {
                info!(
                    session = %e.session_id.short(),
                    subject = %e.subject_id,
                    success = e.success,
                    details = %e.details,
                    "Execution completed"
                );
            }
            Event::Rejected(e) => {
                warn!(
                    subject = ?e.subject_id.as_ref().map(SubjectId::as_str),
                    code = e.code,
                    reason = %e.reason,
                    "Request rejected"
                );
            }
        }
    }
}
