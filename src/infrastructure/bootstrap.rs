//! Composition root: builds stores, cache and orchestrator from configuration.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::adapter::outbound::memory::{
    MemoryConfirmationStore, MemoryOperationLock, MemoryRateLimiter,
};
use crate::adapter::outbound::paper::{
    PaperBalanceSource, PaperExecutor, PaperLedger, PaperQuoteProvider, PaperWalletDirectory,
};
use crate::adapter::outbound::sqlite::{
    create_pool, run_migrations, SqliteConfirmationStore, SqliteOperationLock, SqliteRateLimiter,
};
use crate::application::cache::balance::BalanceCache;
use crate::application::housekeeping::Sweeper;
use crate::application::orchestration::{Collaborators, ExecutionOrchestrator, PipelineStores};
use crate::error::Result;
use crate::infrastructure::config::settings::{Config, PaperConfig, StoreBackend};
use crate::port::outbound::balance::BalanceSource;
use crate::port::outbound::clock::Clock;
use crate::port::outbound::notifier::{LogNotifier, NotifierRegistry};
use crate::port::outbound::store::{
    CleanableStore, ConfirmationStore, OperationLock, RateLimiter,
};

/// Confirmation, lock and rate limit stores for the configured backend.
pub struct StoreSet {
    pub confirmations: Arc<dyn ConfirmationStore>,
    pub locks: Arc<dyn OperationLock>,
    pub rate_limiter: Arc<dyn RateLimiter>,
    /// The same three stores, for the sweeper.
    pub cleanable: Vec<Arc<dyn CleanableStore>>,
}

/// Build the stores selected by `[store].backend`.
///
/// The SQLite backend opens the database and runs pending migrations.
///
/// # Errors
///
/// Returns an error if the database cannot be opened or migrated.
pub fn build_stores(config: &Config, clock: Arc<dyn Clock>) -> Result<StoreSet> {
    let settings = config.confirmation.settings();
    let policy = config.rate_limit.policy();

    let set = match config.store.backend {
        StoreBackend::Memory => {
            let confirmations = Arc::new(MemoryConfirmationStore::new(settings, Arc::clone(&clock)));
            let locks = Arc::new(MemoryOperationLock::new(Arc::clone(&clock)));
            let rate_limiter = Arc::new(MemoryRateLimiter::new(policy, clock));
            StoreSet {
                confirmations: confirmations.clone(),
                locks: locks.clone(),
                rate_limiter: rate_limiter.clone(),
                cleanable: vec![
                    confirmations as Arc<dyn CleanableStore>,
                    locks as Arc<dyn CleanableStore>,
                    rate_limiter as Arc<dyn CleanableStore>,
                ],
            }
        }
        StoreBackend::Sqlite => {
            let pool = create_pool(&config.store.database)?;
            run_migrations(&pool)?;
            let confirmations = Arc::new(SqliteConfirmationStore::new(
                pool.clone(),
                settings,
                Arc::clone(&clock),
            ));
            let locks = Arc::new(SqliteOperationLock::new(pool.clone(), Arc::clone(&clock)));
            let rate_limiter = Arc::new(SqliteRateLimiter::new(pool, policy, clock));
            StoreSet {
                confirmations: confirmations.clone(),
                locks: locks.clone(),
                rate_limiter: rate_limiter.clone(),
                cleanable: vec![
                    confirmations as Arc<dyn CleanableStore>,
                    locks as Arc<dyn CleanableStore>,
                    rate_limiter as Arc<dyn CleanableStore>,
                ],
            }
        }
    };

    info!(
        backend = config.store.backend.as_str(),
        database = %config.store.database,
        "Stores ready"
    );
    Ok(set)
}

/// Build the notifier registry. Events are always mirrored to tracing.
#[must_use]
pub fn build_notifier_registry() -> NotifierRegistry {
    let mut registry = NotifierRegistry::new();
    registry.register(Box::new(LogNotifier));
    registry
}

/// Balance cache over `source`, configured by `[balance_cache]`.
#[must_use]
pub fn build_balance_cache(
    config: &Config,
    source: Arc<dyn BalanceSource>,
    clock: Arc<dyn Clock>,
) -> Arc<BalanceCache> {
    Arc::new(
        BalanceCache::new(source, clock, config.balance_cache.ttl())
            .with_coalescing(config.balance_cache.coalesce),
    )
}

/// A wired pipeline and the sweeper over its stores.
pub struct Pipeline {
    pub orchestrator: Arc<ExecutionOrchestrator>,
    pub sweeper: Sweeper,
}

/// Wire the orchestrator from configuration and the external collaborators.
///
/// # Errors
///
/// Returns an error if the configured stores cannot be built.
pub fn build_pipeline(
    config: &Config,
    collaborators: Collaborators,
    balance_source: Arc<dyn BalanceSource>,
    notifiers: NotifierRegistry,
    clock: Arc<dyn Clock>,
) -> Result<Pipeline> {
    let stores = build_stores(config, Arc::clone(&clock))?;
    let balances = build_balance_cache(config, balance_source, Arc::clone(&clock));

    let sweeper = stores.cleanable.iter().fold(
        Sweeper::new(config.sweep_interval()),
        |sweeper, store| sweeper.with_store(Arc::clone(store)),
    );
    let sweeper = sweeper.with_store(balances.clone());

    let orchestrator = ExecutionOrchestrator::new(
        PipelineStores {
            confirmations: stores.confirmations,
            locks: stores.locks,
            rate_limiter: stores.rate_limiter,
            balances,
        },
        collaborators,
        config.execution_policy(),
        Arc::new(notifiers),
        clock,
    );

    Ok(Pipeline {
        orchestrator: Arc::new(orchestrator),
        sweeper,
    })
}

/// Sweeper over the configured stores only, for one-shot cleanup.
///
/// # Errors
///
/// Returns an error if the configured stores cannot be built.
pub fn build_sweeper(config: &Config, clock: Arc<dyn Clock>) -> Result<Sweeper> {
    let stores = build_stores(config, clock)?;
    Ok(stores
        .cleanable
        .into_iter()
        .fold(Sweeper::new(config.sweep_interval()), Sweeper::with_store))
}

/// Dry-run collaborators sharing one ledger.
pub struct PaperVenue {
    pub ledger: Arc<PaperLedger>,
    pub quotes: Arc<PaperQuoteProvider>,
    pub collaborators: Collaborators,
    pub balance_source: Arc<dyn BalanceSource>,
}

/// Build paper collaborators from `[paper]`.
#[must_use]
pub fn build_paper_venue(config: &PaperConfig, latency: Duration) -> PaperVenue {
    let ledger = Arc::new(PaperLedger::new(config.starting_balance));
    let quotes = Arc::new(PaperQuoteProvider::new(
        config.price,
        config.slippage_tolerance_bps,
    ));
    let collaborators = Collaborators {
        quotes: quotes.clone(),
        executor: Arc::new(PaperExecutor::new(Arc::clone(&ledger), latency)),
        wallets: Arc::new(PaperWalletDirectory),
    };
    PaperVenue {
        balance_source: Arc::new(PaperBalanceSource::new(Arc::clone(&ledger))),
        ledger,
        quotes,
        collaborators,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ConfirmationKind, QuoteRequest, SubjectId};
    use crate::port::inbound::execution::ConfirmationService;
    use crate::testkit::clock::ManualClock;
    use crate::testkit::domain::draft;
    use rust_decimal_macros::dec;

    #[test]
    fn memory_backend_builds_three_sweepable_stores() {
        let clock = Arc::new(ManualClock::new());
        let stores = build_stores(&Config::default(), clock).unwrap();

        assert_eq!(stores.cleanable.len(), 3);
        let names: Vec<_> = stores.cleanable.iter().map(|s| s.store_name()).collect();
        assert_eq!(names, ["confirmations", "operation_locks", "rate_limits"]);
    }

    #[test]
    fn sqlite_backend_shares_state_across_builds() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.store.backend = StoreBackend::Sqlite;
        config.store.database = dir.path().join("state.db").display().to_string();
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new());

        let first = build_stores(&config, Arc::clone(&clock)).unwrap();
        let id = first.confirmations.store(draft("u1")).unwrap();
        let second = build_stores(&config, clock).unwrap();

        assert!(second.confirmations.consume(&id).unwrap().is_some());
        assert!(first.confirmations.consume(&id).unwrap().is_none());
    }

    #[tokio::test]
    async fn paper_pipeline_settles_a_swap() {
        let config = Config::default();
        let venue = build_paper_venue(&config.paper, Duration::ZERO);
        let pipeline = build_pipeline(
            &config,
            venue.collaborators.clone(),
            Arc::clone(&venue.balance_source),
            build_notifier_registry(),
            Arc::new(ManualClock::new()),
        )
        .unwrap();
        let subject = SubjectId::new("u1");
        let request =
            QuoteRequest::try_new(subject.clone(), ConfirmationKind::SwapExecute, dec!(0.5), "SOL")
                .unwrap();

        let ticket = pipeline.orchestrator.open_confirmation(request).await.unwrap();
        let outcome = pipeline.orchestrator.execute(&ticket.session_id).await.unwrap();
        let balances = pipeline.orchestrator.balances(&subject).await.unwrap();

        assert!(outcome.is_settled());
        assert_eq!(balances.amount("SOL"), dec!(0.5));
        assert_eq!(balances.amount("USDC"), dec!(925.0));
        assert_eq!(pipeline.sweeper.len(), 4);
    }
}
