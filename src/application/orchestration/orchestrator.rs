//! Confirm-then-execute orchestration.
//!
//! The orchestrator composes the stores and collaborators into the request
//! lifecycle:
//!
//! 1. `open_confirmation`: rate check, quote, store a session.
//! 2. `execute`: rate check, fresh quote, slippage check (possibly asking
//!    the caller to re-confirm), consume the session, take the subject's
//!    lock, run the executor under a timeout, invalidate cached balances,
//!    release the lock.
//!
//! The session is read without consuming it until the slippage decision
//! is made, because a re-confirmation must keep the same session id alive.
//! `consume` remains the single-use gate for the executor.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use super::guard::ExecutionGuard;
use crate::application::cache::balance::BalanceCache;
use crate::application::slippage::SlippagePolicy;
use crate::domain::{
    Balances, ConfirmationDraft, ConfirmationKind, ConfirmationSession, ConfirmationTicket,
    ExecutionOutcome, ExecutionStage, LockKey, OperationClass, Quote, QuoteRequest,
    Reconfirmation, SessionId, Settlement, SubjectId,
};
use crate::error::PipelineError;
use crate::port::inbound::execution::ConfirmationService;
use crate::port::outbound::clock::{span, Clock};
use crate::port::outbound::executor::{SwapExecutor, WalletDirectory};
use crate::port::outbound::notifier::{
    Event, ExecutionEvent, NotifierRegistry, RejectionEvent, StageEvent,
};
use crate::port::outbound::quote::QuoteProvider;
use crate::port::outbound::store::{ConfirmationStore, OperationLock, RateLimiter};

/// Lock lifetime for each operation class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockTtls {
    pub swap: Duration,
    pub balance_mutation: Duration,
    pub wallet_create: Duration,
}

impl LockTtls {
    #[must_use]
    pub const fn for_class(&self, class: OperationClass) -> Duration {
        match class {
            OperationClass::Swap => self.swap,
            OperationClass::BalanceMutation => self.balance_mutation,
            OperationClass::WalletCreate => self.wallet_create,
        }
    }
}

impl Default for LockTtls {
    fn default() -> Self {
        Self {
            swap: Duration::from_secs(60),
            balance_mutation: Duration::from_secs(15 * 60),
            wallet_create: Duration::from_secs(2 * 60),
        }
    }
}

/// Timing knobs for execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionPolicy {
    pub lock_ttls: LockTtls,
    /// Upper bound on a single executor call.
    pub execution_timeout: Duration,
}

impl Default for ExecutionPolicy {
    fn default() -> Self {
        Self {
            lock_ttls: LockTtls::default(),
            execution_timeout: Duration::from_secs(30),
        }
    }
}

/// State the orchestrator reads and mutates.
#[derive(Clone)]
pub struct PipelineStores {
    pub confirmations: Arc<dyn ConfirmationStore>,
    pub locks: Arc<dyn OperationLock>,
    pub rate_limiter: Arc<dyn RateLimiter>,
    pub balances: Arc<BalanceCache>,
}

/// External services the orchestrator calls out to.
#[derive(Clone)]
pub struct Collaborators {
    pub quotes: Arc<dyn QuoteProvider>,
    pub executor: Arc<dyn SwapExecutor>,
    pub wallets: Arc<dyn WalletDirectory>,
}

/// Drives confirmations from quote to settlement.
pub struct ExecutionOrchestrator {
    stores: PipelineStores,
    collaborators: Collaborators,
    policy: ExecutionPolicy,
    notifiers: Arc<NotifierRegistry>,
    clock: Arc<dyn Clock>,
}

impl ExecutionOrchestrator {
    #[must_use]
    pub fn new(
        stores: PipelineStores,
        collaborators: Collaborators,
        policy: ExecutionPolicy,
        notifiers: Arc<NotifierRegistry>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            stores,
            collaborators,
            policy,
            notifiers,
            clock,
        }
    }

    #[must_use]
    pub const fn policy(&self) -> &ExecutionPolicy {
        &self.policy
    }

    #[must_use]
    pub const fn stores(&self) -> &PipelineStores {
        &self.stores
    }

    /// Current balances of the subject's wallet, served from the cache.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Unavailable`] if the wallet or balance
    /// source cannot be reached.
    pub async fn balances(&self, subject_id: &SubjectId) -> Result<Balances, PipelineError> {
        let context = self
            .collaborators
            .wallets
            .signing_context(subject_id)
            .await?;
        Ok(self
            .stores
            .balances
            .get_balances(&context.wallet_address)
            .await?)
    }

    fn check_rate(&self, action: &str, subject_id: &SubjectId) -> Result<(), PipelineError> {
        let key = format!("{action}:{subject_id}");
        let decision = self
            .stores
            .rate_limiter
            .check_and_record(&key, self.clock.now())?;
        if decision.allowed {
            Ok(())
        } else {
            debug!(key = %key, count = decision.count, "Rate limit exceeded");
            Err(PipelineError::RateLimited)
        }
    }

    fn emit_stage(
        &self,
        session_id: &SessionId,
        subject_id: &SubjectId,
        kind: ConfirmationKind,
        stage: ExecutionStage,
    ) {
        self.notifiers.notify_all(Event::StageChanged(StageEvent {
            session_id: session_id.clone(),
            subject_id: subject_id.clone(),
            kind,
            stage,
        }));
    }

    fn emit_session_stage(&self, session: &ConfirmationSession, stage: ExecutionStage) {
        self.emit_stage(&session.session_id, &session.subject_id, session.kind, stage);
    }

    fn emit_rejection(&self, subject_id: Option<&SubjectId>, error: &PipelineError) {
        // Executor failures are reported as completed executions instead.
        if matches!(error, PipelineError::ExecutionFailed(_)) {
            return;
        }
        self.notifiers
            .notify_all(Event::Rejected(RejectionEvent::new(subject_id, error)));
    }

    async fn open(&self, request: QuoteRequest) -> Result<ConfirmationTicket, PipelineError> {
        let subject_id = request.subject_id().clone();
        self.check_rate("open", &subject_id)?;

        let quote = self
            .collaborators
            .quotes
            .get_quote(&request)
            .await
            .map_err(|e| PipelineError::QuoteFetchFailed(e.to_string()))?;
        quote
            .validate()
            .map_err(|e| PipelineError::QuoteFetchFailed(e.to_string()))?;

        let settings = self.stores.confirmations.settings();
        let expires_at = self.clock.now() + span(settings.ttl);
        let session_id = self
            .stores
            .confirmations
            .store(ConfirmationDraft::new(&request, quote.clone()))?;

        info!(
            session = %session_id.short(),
            subject = %subject_id,
            kind = %request.kind(),
            amount = %request.amount(),
            asset = request.asset(),
            "Confirmation opened"
        );
        self.emit_stage(
            &session_id,
            &subject_id,
            request.kind(),
            ExecutionStage::ConfirmedPending,
        );

        Ok(ConfirmationTicket {
            session_id,
            quote,
            expires_at,
        })
    }

    async fn fresh_quote(&self, pending: &ConfirmationSession) -> Result<Quote, PipelineError> {
        let request = QuoteRequest::try_new(
            pending.subject_id.clone(),
            pending.kind,
            pending.amount,
            pending.asset.clone(),
        )?;
        let fresh = self
            .collaborators
            .quotes
            .get_quote(&request)
            .await
            .map_err(|e| PipelineError::QuoteFetchFailed(e.to_string()))?;
        fresh
            .validate()
            .map_err(|e| PipelineError::QuoteFetchFailed(e.to_string()))?;
        Ok(fresh)
    }

    /// The price moved beyond tolerance: refresh the session or give up.
    fn reconfirm(
        &self,
        pending: ConfirmationSession,
        fresh: Quote,
    ) -> Result<ExecutionOutcome, PipelineError> {
        let confirmations = &self.stores.confirmations;
        let settings = confirmations.settings();
        let moved_bps = SlippagePolicy::bps(&pending.quote, &fresh).unwrap_or_default();

        if pending.reconfirm_count >= settings.max_reconfirms {
            confirmations.cancel(&pending.session_id)?;
            info!(
                session = %pending.session_id.short(),
                subject = %pending.subject_id,
                moved_bps = %moved_bps,
                "Price moved beyond tolerance after reconfirm limit, session cancelled"
            );
            self.emit_session_stage(&pending, ExecutionStage::Cancelled);
            return Err(PipelineError::ReconfirmLimitExceeded);
        }

        self.emit_session_stage(&pending, ExecutionStage::Reconfirming);
        if !confirmations.update_quote(&pending.session_id, fresh.clone())? {
            self.emit_session_stage(&pending, ExecutionStage::Expired);
            return Err(PipelineError::NotFoundOrExpired);
        }

        let used = pending.reconfirm_count + 1;
        info!(
            session = %pending.session_id.short(),
            subject = %pending.subject_id,
            moved_bps = %moved_bps,
            tolerance_bps = pending.quote.slippage_tolerance_bps(),
            "Price moved beyond tolerance, re-confirmation required"
        );
        self.emit_session_stage(&pending, ExecutionStage::ConfirmedPending);

        Ok(ExecutionOutcome::ReconfirmRequired(Reconfirmation {
            session_id: pending.session_id,
            original: pending.quote,
            fresh,
            moved_bps,
            expires_at: self.clock.now() + span(settings.ttl),
            reconfirms_remaining: settings.max_reconfirms.saturating_sub(used),
        }))
    }

    async fn execute_pending(
        &self,
        pending: ConfirmationSession,
    ) -> Result<ExecutionOutcome, PipelineError> {
        let subject_id = pending.subject_id.clone();
        self.check_rate("execute", &subject_id)?;

        let fresh = self.fresh_quote(&pending).await?;
        if SlippagePolicy::exceeded(&pending.quote, &fresh) {
            return self.reconfirm(pending, fresh);
        }

        let context = self
            .collaborators
            .wallets
            .signing_context(&subject_id)
            .await?;

        let Some(session) = self.stores.confirmations.consume(&pending.session_id)? else {
            debug!(
                session = %pending.session_id.short(),
                "Session consumed or expired by a concurrent caller"
            );
            self.emit_session_stage(&pending, ExecutionStage::Expired);
            return Err(PipelineError::NotFoundOrExpired);
        };
        if session.reconfirm_count != pending.reconfirm_count {
            warn!(
                session = %session.session_id.short(),
                "Session was re-confirmed concurrently, discarding stale approval"
            );
            self.emit_session_stage(&session, ExecutionStage::Expired);
            return Err(PipelineError::NotFoundOrExpired);
        }

        let class = session.kind.operation_class();
        let key = LockKey::new(subject_id.clone(), class);
        let Some(guard) = ExecutionGuard::acquire(
            Arc::clone(&self.stores.locks),
            Arc::clone(&self.stores.balances),
            &key,
            self.policy.lock_ttls.for_class(class),
            context.wallet_address.clone(),
        )?
        else {
            info!(
                session = %session.session_id.short(),
                key = %key,
                "Operation already in progress, confirmation discarded"
            );
            self.emit_session_stage(&session, ExecutionStage::Cancelled);
            return Err(PipelineError::OperationInProgress);
        };
        self.emit_session_stage(&session, ExecutionStage::LockedExecuting);

        let executor = &self.collaborators.executor;
        debug!(
            session = %session.session_id.short(),
            executor = executor.executor_name(),
            "Submitting confirmed quote"
        );
        let result = tokio::time::timeout(
            self.policy.execution_timeout,
            executor.execute(&session.quote, &context),
        )
        .await;
        guard.finish();

        let receipt = match result {
            Ok(Ok(receipt)) => receipt,
            Ok(Err(e)) => return Err(self.fail(&session, e.to_string())),
            Err(_) => {
                let reason = format!(
                    "executor timed out after {}ms",
                    self.policy.execution_timeout.as_millis()
                );
                return Err(self.fail(&session, reason));
            }
        };

        info!(
            session = %session.session_id.short(),
            subject = %subject_id,
            tx = %receipt.tx_id,
            confirmed = receipt.confirmed,
            "Execution settled"
        );
        self.emit_session_stage(&session, ExecutionStage::Succeeded);
        self.notifiers
            .notify_all(Event::ExecutionCompleted(ExecutionEvent {
                session_id: session.session_id.clone(),
                subject_id: subject_id.clone(),
                success: true,
                details: receipt.tx_id.clone(),
            }));

        Ok(ExecutionOutcome::Settled(Settlement {
            session_id: session.session_id,
            subject_id,
            tx_id: receipt.tx_id,
            confirmed: receipt.confirmed,
            quote: session.quote,
        }))
    }

    fn fail(&self, session: &ConfirmationSession, reason: String) -> PipelineError {
        error!(
            session = %session.session_id.short(),
            subject = %session.subject_id,
            reason = %reason,
            "Execution failed"
        );
        self.emit_session_stage(session, ExecutionStage::Failed);
        self.notifiers
            .notify_all(Event::ExecutionCompleted(ExecutionEvent {
                session_id: session.session_id.clone(),
                subject_id: session.subject_id.clone(),
                success: false,
                details: reason.clone(),
            }));
        PipelineError::ExecutionFailed(reason)
    }
}

#[async_trait]
impl ConfirmationService for ExecutionOrchestrator {
    async fn open_confirmation(
        &self,
        request: QuoteRequest,
    ) -> Result<ConfirmationTicket, PipelineError> {
        let subject_id = request.subject_id().clone();
        let result = self.open(request).await;
        if let Err(e) = &result {
            self.emit_rejection(Some(&subject_id), e);
        }
        result
    }

    fn preview(&self, session_id: &SessionId) -> Result<Option<ConfirmationSession>, PipelineError> {
        Ok(self.stores.confirmations.get(session_id)?)
    }

    async fn execute(&self, session_id: &SessionId) -> Result<ExecutionOutcome, PipelineError> {
        let pending = match self.stores.confirmations.get(session_id) {
            Ok(Some(session)) => session,
            Ok(None) => {
                debug!(session = %session_id.short(), "Execute on unknown or expired session");
                let error = PipelineError::NotFoundOrExpired;
                self.emit_rejection(None, &error);
                return Err(error);
            }
            Err(e) => {
                let error = PipelineError::from(e);
                self.emit_rejection(None, &error);
                return Err(error);
            }
        };

        let subject_id = pending.subject_id.clone();
        let result = self.execute_pending(pending).await;
        if let Err(e) = &result {
            self.emit_rejection(Some(&subject_id), e);
        }
        result
    }

    fn cancel(&self, session_id: &SessionId) -> Result<bool, PipelineError> {
        let confirmations = &self.stores.confirmations;
        let session = confirmations.get(session_id)?;
        let removed = confirmations.cancel(session_id)?;
        if removed {
            debug!(session = %session_id.short(), "Confirmation cancelled");
            if let Some(session) = session {
                self.emit_session_stage(&session, ExecutionStage::Cancelled);
            }
        }
        Ok(removed)
    }

    fn ttl_seconds(&self) -> u64 {
        self.stores.confirmations.ttl_seconds()
    }
}
