//! Controllable collaborator doubles for orchestrator and cache tests.
//!
//! - [`ScriptedQuoteProvider`] pops scripted quote results, then falls back
//!   to a fixed quote.
//! - [`RecordingExecutor`] records every call and tracks peak concurrency.
//! - [`CountingBalanceSource`] counts batched fetches.
//! - [`StaticWalletDirectory`] derives a wallet address from the subject.
//! - [`RecordingNotifier`] keeps every event for later assertions.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::domain::{
    Balances, ExecutionReceipt, ExecutionStage, Quote, QuoteRequest, SessionId, SubjectId,
};
use crate::error::{Error, Result};
use crate::port::outbound::balance::BalanceSource;
use crate::port::outbound::executor::{SigningContext, SwapExecutor, WalletDirectory};
use crate::port::outbound::notifier::{Event, Notifier};
use crate::port::outbound::quote::QuoteProvider;

// ---------------------------------------------------------------------------
// ScriptedQuoteProvider
// ---------------------------------------------------------------------------

/// Quote provider with a queue of scripted results.
///
/// Each call pops the next scripted result; once the queue is empty every
/// call returns the fallback quote.
pub struct ScriptedQuoteProvider {
    script: Mutex<VecDeque<Result<Quote>>>,
    fallback: Mutex<Quote>,
    calls: AtomicU32,
}

impl ScriptedQuoteProvider {
    pub fn new(fallback: Quote) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: Mutex::new(fallback),
            calls: AtomicU32::new(0),
        }
    }

    pub fn with_script(self, results: Vec<Result<Quote>>) -> Self {
        *self.script.lock() = results.into();
        self
    }

    /// Queue one more result.
    pub fn push(&self, result: Result<Quote>) {
        self.script.lock().push_back(result);
    }

    /// Replace the quote returned once the script is exhausted.
    pub fn set_fallback(&self, quote: Quote) {
        *self.fallback.lock() = quote;
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QuoteProvider for ScriptedQuoteProvider {
    async fn get_quote(&self, _request: &QuoteRequest) -> Result<Quote> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().pop_front();
        match next {
            Some(result) => result,
            None => Ok(self.fallback.lock().clone()),
        }
    }

    fn provider_name(&self) -> &'static str {
        "scripted"
    }
}

// ---------------------------------------------------------------------------
// RecordingExecutor
// ---------------------------------------------------------------------------

/// Executor that records calls, optionally sleeps, and optionally fails.
pub struct RecordingExecutor {
    delay: Duration,
    failure: Mutex<Option<String>>,
    calls: Mutex<Vec<(Quote, SigningContext)>>,
    in_flight: AtomicU32,
    peak_in_flight: AtomicU32,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self {
            delay: Duration::ZERO,
            failure: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicU32::new(0),
            peak_in_flight: AtomicU32::new(0),
        }
    }

    /// Sleep this long inside every call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Fail every subsequent call with `reason`.
    pub fn fail_with(&self, reason: &str) {
        *self.failure.lock() = Some(reason.to_string());
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Quotes passed to the executor, in call order.
    pub fn executed_quotes(&self) -> Vec<Quote> {
        self.calls.lock().iter().map(|(q, _)| q.clone()).collect()
    }

    pub fn contexts(&self) -> Vec<SigningContext> {
        self.calls.lock().iter().map(|(_, c)| c.clone()).collect()
    }

    /// Highest number of calls observed running at once.
    pub fn peak_concurrency(&self) -> u32 {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

impl Default for RecordingExecutor {
    fn default() -> Self {
        Self::new()
    }
}

struct InFlight<'a>(&'a AtomicU32);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl SwapExecutor for RecordingExecutor {
    async fn execute(&self, quote: &Quote, context: &SigningContext) -> Result<ExecutionReceipt> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _in_flight = InFlight(&self.in_flight);
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);

        let tx_number = {
            let mut calls = self.calls.lock();
            calls.push((quote.clone(), context.clone()));
            calls.len()
        };

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let failure = self.failure.lock().clone();
        if let Some(reason) = failure {
            return Err(Error::Execution(reason));
        }

        Ok(ExecutionReceipt {
            tx_id: format!("tx-{tx_number}"),
            confirmed: true,
        })
    }

    fn executor_name(&self) -> &'static str {
        "recording"
    }
}

// ---------------------------------------------------------------------------
// CountingBalanceSource
// ---------------------------------------------------------------------------

/// Balance source backed by a map, counting every batched fetch.
pub struct CountingBalanceSource {
    balances: Mutex<HashMap<String, Balances>>,
    fetches: AtomicU32,
    failing: AtomicBool,
    delay: Duration,
}

impl CountingBalanceSource {
    pub fn new() -> Self {
        Self {
            balances: Mutex::new(HashMap::new()),
            fetches: AtomicU32::new(0),
            failing: AtomicBool::new(false),
            delay: Duration::ZERO,
        }
    }

    /// Sleep this long inside every fetch.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Set what the next fetch for `key` returns.
    pub fn set(&self, key: &str, balances: Balances) {
        self.balances.lock().insert(key.to_string(), balances);
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn fetch_count(&self) -> u32 {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl Default for CountingBalanceSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BalanceSource for CountingBalanceSource {
    async fn get_all_balances(&self, subject_key: &str) -> Result<Balances> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::BalanceFetch("rpc unavailable".into()));
        }
        Ok(self
            .balances
            .lock()
            .get(subject_key)
            .cloned()
            .unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// StaticWalletDirectory
// ---------------------------------------------------------------------------

/// Wallet directory mapping subject `u1` to wallet `wallet-u1`.
#[derive(Debug, Default)]
pub struct StaticWalletDirectory {
    missing: Mutex<Vec<SubjectId>>,
}

impl StaticWalletDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make lookups for `subject_id` fail.
    pub fn remove(&self, subject_id: &SubjectId) {
        self.missing.lock().push(subject_id.clone());
    }

    pub fn wallet_for(subject_id: &SubjectId) -> String {
        format!("wallet-{subject_id}")
    }
}

#[async_trait]
impl WalletDirectory for StaticWalletDirectory {
    async fn signing_context(&self, subject_id: &SubjectId) -> Result<SigningContext> {
        if self.missing.lock().contains(subject_id) {
            return Err(Error::Wallet(format!("no wallet for {subject_id}")));
        }
        Ok(SigningContext {
            subject_id: subject_id.clone(),
            wallet_address: Self::wallet_for(subject_id),
            key_ref: format!("test://keys/{subject_id}"),
        })
    }
}

// ---------------------------------------------------------------------------
// RecordingNotifier
// ---------------------------------------------------------------------------

/// Notifier that keeps every event. Clones share the same log.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    events: Arc<Mutex<Vec<Event>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    /// Stages reported for one session, in order.
    pub fn stages(&self, session_id: &SessionId) -> Vec<ExecutionStage> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                Event::StageChanged(e) if &e.session_id == session_id => Some(e.stage),
                _ => None,
            })
            .collect()
    }

    /// Codes of every rejection, in order.
    pub fn rejection_codes(&self) -> Vec<&'static str> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                Event::Rejected(e) => Some(e.code),
                _ => None,
            })
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, event: Event) {
        self.events.lock().push(event);
    }
}
