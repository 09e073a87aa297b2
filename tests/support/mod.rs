#![allow(dead_code)]

use std::sync::Arc;

use rust_decimal_macros::dec;
use swapguard::application::orchestration::{Collaborators, ExecutionOrchestrator};
use swapguard::infrastructure::bootstrap::build_pipeline;
use swapguard::infrastructure::config::settings::Config;
use swapguard::port::outbound::notifier::NotifierRegistry;
use swapguard::testkit::clock::ManualClock;
use swapguard::testkit::collaborators::{
    CountingBalanceSource, RecordingExecutor, RecordingNotifier, ScriptedQuoteProvider,
    StaticWalletDirectory,
};
use swapguard::testkit::config;
use swapguard::testkit::domain::quote;

/// An orchestrator wired to test doubles, with handles to each of them.
pub struct Harness {
    pub orchestrator: Arc<ExecutionOrchestrator>,
    pub clock: ManualClock,
    pub quotes: Arc<ScriptedQuoteProvider>,
    pub executor: Arc<RecordingExecutor>,
    pub balances: Arc<CountingBalanceSource>,
    pub wallets: Arc<StaticWalletDirectory>,
    pub notifier: RecordingNotifier,
}

impl Harness {
    /// Memory stores, relaxed rate limit, instant executor.
    pub fn new() -> Self {
        Self::build(config::relaxed(), RecordingExecutor::new())
    }

    pub fn with_config(config: Config) -> Self {
        Self::build(config, RecordingExecutor::new())
    }

    pub fn with_executor(executor: RecordingExecutor) -> Self {
        Self::build(config::relaxed(), executor)
    }

    pub fn with_executor_and_config(executor: RecordingExecutor, config: Config) -> Self {
        Self::build(config, executor)
    }

    pub fn build(config: Config, executor: RecordingExecutor) -> Self {
        let clock = ManualClock::new();
        let quotes = Arc::new(ScriptedQuoteProvider::new(quote(dec!(100))));
        let executor = Arc::new(executor);
        let balances = Arc::new(CountingBalanceSource::new());
        let wallets = Arc::new(StaticWalletDirectory::new());
        let notifier = RecordingNotifier::new();

        let mut registry = NotifierRegistry::new();
        registry.register(Box::new(notifier.clone()));

        let pipeline = build_pipeline(
            &config,
            Collaborators {
                quotes: quotes.clone(),
                executor: executor.clone(),
                wallets: wallets.clone(),
            },
            balances.clone(),
            registry,
            Arc::new(clock.clone()),
        )
        .expect("pipeline must build");

        Self {
            orchestrator: pipeline.orchestrator,
            clock,
            quotes,
            executor,
            balances,
            wallets,
            notifier,
        }
    }
}
