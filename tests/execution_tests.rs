//! Integration tests for the confirm-then-execute pipeline.

mod support;

use std::sync::Arc;
use std::time::Duration;

use rust_decimal_macros::dec;
use support::Harness;
use swapguard::domain::{ConfirmationKind, ExecutionOutcome, ExecutionStage, SessionId};
use swapguard::error::{Error, PipelineError};
use swapguard::port::inbound::execution::ConfirmationService;
use swapguard::port::outbound::notifier::Event;
use swapguard::testkit::collaborators::{RecordingExecutor, StaticWalletDirectory};
use swapguard::testkit::config;
use swapguard::testkit::domain::{quote, request, subject, swap_lock, swap_request};

async fn open(h: &Harness, subject_id: &str) -> SessionId {
    h.orchestrator
        .open_confirmation(swap_request(subject_id))
        .await
        .expect("open must succeed")
        .session_id
}

fn lock_is_free(h: &Harness, subject_id: &str) -> bool {
    h.orchestrator
        .stores()
        .locks
        .try_acquire(&swap_lock(subject_id), Duration::from_secs(1))
        .unwrap()
        .is_some()
}

#[tokio::test]
async fn confirmed_swap_settles_with_the_approved_quote() {
    let h = Harness::new();
    let id = open(&h, "u1").await;

    let outcome = h.orchestrator.execute(&id).await.unwrap();

    let settlement = outcome.settlement().expect("settled");
    assert_eq!(settlement.tx_id, "tx-1");
    assert_eq!(settlement.quote, quote(dec!(100)));
    assert_eq!(h.executor.executed_quotes(), vec![quote(dec!(100))]);
    assert_eq!(h.executor.contexts()[0].wallet_address, "wallet-u1");
    assert_eq!(
        h.notifier.stages(&id),
        vec![
            ExecutionStage::ConfirmedPending,
            ExecutionStage::LockedExecuting,
            ExecutionStage::Succeeded,
        ]
    );
    assert!(lock_is_free(&h, "u1"));
}

#[tokio::test]
async fn second_execute_of_same_session_is_rejected() {
    let h = Harness::new();
    let id = open(&h, "u1").await;

    h.orchestrator.execute(&id).await.unwrap();
    let replay = h.orchestrator.execute(&id).await;

    assert_eq!(replay, Err(PipelineError::NotFoundOrExpired));
    assert_eq!(h.executor.call_count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_executes_settle_exactly_once() {
    let h = Harness::with_executor(RecordingExecutor::new().with_delay(Duration::from_millis(50)));
    let id = open(&h, "u1").await;

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let orchestrator = Arc::clone(&h.orchestrator);
            let id = id.clone();
            tokio::spawn(async move { orchestrator.execute(&id).await })
        })
        .collect();
    let mut settled = 0;
    let mut rejected = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(outcome) if outcome.is_settled() => settled += 1,
            Err(PipelineError::NotFoundOrExpired) => rejected += 1,
            other => panic!("unexpected result: {other:?}"),
        }
    }

    assert_eq!(settled, 1);
    assert_eq!(rejected, 7);

    let replay = h.orchestrator.execute(&id).await;
    assert_eq!(replay, Err(PipelineError::NotFoundOrExpired));
    assert_eq!(h.executor.call_count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn running_operation_blocks_same_subject_and_class() {
    let h = Harness::with_executor(RecordingExecutor::new().with_delay(Duration::from_millis(200)));
    let first = open(&h, "u1").await;
    let second = open(&h, "u1").await;

    let running = {
        let orchestrator = Arc::clone(&h.orchestrator);
        let first = first.clone();
        tokio::spawn(async move { orchestrator.execute(&first).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    let blocked = h.orchestrator.execute(&second).await;

    assert_eq!(blocked, Err(PipelineError::OperationInProgress));
    assert!(running.await.unwrap().unwrap().is_settled());
    assert_eq!(h.executor.call_count(), 1);
    assert!(h.orchestrator.preview(&second).unwrap().is_none());
    assert_eq!(
        h.notifier.stages(&second).last(),
        Some(&ExecutionStage::Cancelled)
    );
    assert!(h.notifier.rejection_codes().contains(&"operation_in_progress"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn different_classes_and_subjects_run_in_parallel() {
    let h = Harness::with_executor(RecordingExecutor::new().with_delay(Duration::from_millis(100)));
    let swap = open(&h, "u1").await;
    let buy = h
        .orchestrator
        .open_confirmation(request("u1", ConfirmationKind::PortfolioBuy))
        .await
        .unwrap()
        .session_id;
    let other = open(&h, "u2").await;

    let handles: Vec<_> = [swap, buy, other]
        .into_iter()
        .map(|id| {
            let orchestrator = Arc::clone(&h.orchestrator);
            tokio::spawn(async move { orchestrator.execute(&id).await })
        })
        .collect();
    for handle in handles {
        assert!(handle.await.unwrap().unwrap().is_settled());
    }

    assert_eq!(h.executor.peak_concurrency(), 3);
}

#[tokio::test]
async fn price_move_beyond_tolerance_requires_reconfirmation() {
    let h = Harness::new();
    let id = open(&h, "u1").await;
    h.quotes.push(Ok(quote(dec!(101))));

    let outcome = h.orchestrator.execute(&id).await.unwrap();

    let ExecutionOutcome::ReconfirmRequired(reconfirm) = outcome else {
        panic!("expected reconfirmation");
    };
    assert_eq!(reconfirm.session_id, id);
    assert_eq!(reconfirm.original, quote(dec!(100)));
    assert_eq!(reconfirm.fresh, quote(dec!(101)));
    assert_eq!(reconfirm.moved_bps, dec!(100));
    assert_eq!(reconfirm.reconfirms_remaining, 0);
    assert_eq!(h.executor.call_count(), 0);

    let session = h.orchestrator.preview(&id).unwrap().unwrap();
    assert_eq!(session.reconfirm_count, 1);
    assert_eq!(session.quote, quote(dec!(101)));

    h.quotes.set_fallback(quote(dec!(101)));
    let settled = h.orchestrator.execute(&id).await.unwrap();
    assert_eq!(settled.settlement().unwrap().quote, quote(dec!(101)));
    assert!(h
        .notifier
        .stages(&id)
        .contains(&ExecutionStage::Reconfirming));
}

#[tokio::test]
async fn second_price_move_cancels_the_session() {
    let h = Harness::new();
    let id = open(&h, "u1").await;
    h.quotes.push(Ok(quote(dec!(101))));
    h.orchestrator.execute(&id).await.unwrap();

    h.quotes.push(Ok(quote(dec!(103))));
    let result = h.orchestrator.execute(&id).await;

    assert_eq!(result, Err(PipelineError::ReconfirmLimitExceeded));
    assert!(h.orchestrator.preview(&id).unwrap().is_none());
    assert_eq!(h.executor.call_count(), 0);
    assert_eq!(h.notifier.rejection_codes(), vec!["reconfirm_limit_exceeded"]);
}

#[tokio::test]
async fn move_within_tolerance_executes_approved_quote() {
    let h = Harness::new();
    let id = open(&h, "u1").await;
    h.quotes.push(Ok(quote(dec!(99.6))));

    let outcome = h.orchestrator.execute(&id).await.unwrap();

    assert!(outcome.is_settled());
    assert_eq!(h.executor.executed_quotes(), vec![quote(dec!(100))]);
}

#[tokio::test]
async fn quote_failure_on_execute_keeps_the_session() {
    let h = Harness::new();
    let id = open(&h, "u1").await;
    h.quotes.push(Err(Error::Quote("aggregator down".into())));

    let result = h.orchestrator.execute(&id).await;

    assert!(matches!(result, Err(PipelineError::QuoteFetchFailed(_))));
    assert!(h.orchestrator.preview(&id).unwrap().is_some());
    assert!(h.orchestrator.execute(&id).await.unwrap().is_settled());
}

#[tokio::test]
async fn executor_failure_releases_lock_and_invalidates_balances() {
    let h = Harness::new();
    let wallet = StaticWalletDirectory::wallet_for(&subject("u1"));
    h.orchestrator.balances(&subject("u1")).await.unwrap();
    h.orchestrator.balances(&subject("u1")).await.unwrap();
    assert_eq!(h.balances.fetch_count(), 1);

    let id = open(&h, "u1").await;
    h.executor.fail_with("simulation failed: slippage");
    let result = h.orchestrator.execute(&id).await;

    assert!(matches!(result, Err(PipelineError::ExecutionFailed(_))));
    assert!(lock_is_free(&h, "u1"));
    assert!(h.orchestrator.preview(&id).unwrap().is_none());
    assert_eq!(h.notifier.stages(&id).last(), Some(&ExecutionStage::Failed));
    assert!(h.notifier.events().iter().any(|event| matches!(
        event,
        Event::ExecutionCompleted(e) if !e.success && e.session_id == id
    )));
    assert!(h.notifier.rejection_codes().is_empty());

    h.orchestrator.balances(&subject("u1")).await.unwrap();
    assert_eq!(h.balances.fetch_count(), 2, "cache for {wallet} was not invalidated");
}

#[tokio::test]
async fn successful_execution_invalidates_balances() {
    let h = Harness::new();
    h.orchestrator.balances(&subject("u1")).await.unwrap();
    let id = open(&h, "u1").await;

    h.orchestrator.execute(&id).await.unwrap();
    h.orchestrator.balances(&subject("u1")).await.unwrap();

    assert_eq!(h.balances.fetch_count(), 2);
}

#[tokio::test]
async fn slow_executor_times_out_and_releases_lock() {
    let mut config = config::relaxed();
    config.execution.timeout_secs = 1;
    let h = Harness::build(
        config,
        RecordingExecutor::new().with_delay(Duration::from_secs(5)),
    );
    let id = open(&h, "u1").await;

    let result = h.orchestrator.execute(&id).await;

    let Err(PipelineError::ExecutionFailed(reason)) = result else {
        panic!("expected timeout failure, got {result:?}");
    };
    assert!(reason.contains("timed out"));
    assert!(lock_is_free(&h, "u1"));
}

#[tokio::test]
async fn expired_session_is_not_executed() {
    let h = Harness::new();
    let id = open(&h, "u1").await;

    h.clock.advance(Duration::from_secs(60));
    let result = h.orchestrator.execute(&id).await;

    assert_eq!(result, Err(PipelineError::NotFoundOrExpired));
    assert_eq!(h.executor.call_count(), 0);
    assert_eq!(h.quotes.calls(), 1);
}

#[tokio::test]
async fn cancelled_session_cannot_execute() {
    let h = Harness::new();
    let id = open(&h, "u1").await;

    assert!(h.orchestrator.cancel(&id).unwrap());
    assert!(!h.orchestrator.cancel(&id).unwrap());
    assert_eq!(
        h.orchestrator.execute(&id).await,
        Err(PipelineError::NotFoundOrExpired)
    );
    assert_eq!(
        h.notifier.stages(&id),
        vec![ExecutionStage::ConfirmedPending, ExecutionStage::Cancelled]
    );
}

#[tokio::test]
async fn missing_wallet_is_unavailable_and_keeps_session() {
    let h = Harness::new();
    let id = open(&h, "u1").await;
    h.wallets.remove(&subject("u1"));

    let result = h.orchestrator.execute(&id).await;

    assert!(matches!(result, Err(PipelineError::Unavailable(_))));
    assert!(h.orchestrator.preview(&id).unwrap().is_some());
    assert_eq!(h.executor.call_count(), 0);
}

#[tokio::test]
async fn failed_quote_on_open_stores_nothing() {
    let h = Harness::new();
    h.quotes.push(Err(Error::Quote("no route".into())));

    let result = h.orchestrator.open_confirmation(swap_request("u1")).await;

    assert!(matches!(result, Err(PipelineError::QuoteFetchFailed(_))));
    assert_eq!(h.notifier.rejection_codes(), vec!["quote_fetch_failed"]);
}

#[tokio::test]
async fn open_is_rate_limited_per_subject() {
    let mut config = config::relaxed();
    config.rate_limit.limit = 2;
    let h = Harness::with_config(config);

    open(&h, "u1").await;
    open(&h, "u1").await;
    let third = h.orchestrator.open_confirmation(swap_request("u1")).await;
    let other = h.orchestrator.open_confirmation(swap_request("u2")).await;

    assert_eq!(third, Err(PipelineError::RateLimited));
    assert!(other.is_ok());
    assert_eq!(h.quotes.calls(), 3);

    h.clock.advance(Duration::from_secs(60));
    assert!(h
        .orchestrator
        .open_confirmation(swap_request("u1"))
        .await
        .is_ok());
}

#[tokio::test]
async fn execute_is_rate_limited_before_quoting() {
    let mut config = config::relaxed();
    config.rate_limit.limit = 1;
    config.confirmation.ttl_secs = 120;
    let h = Harness::with_config(config);
    let first = open(&h, "u1").await;
    h.clock.advance(Duration::from_secs(61));
    let second = open(&h, "u1").await;

    assert!(h.orchestrator.execute(&first).await.unwrap().is_settled());
    let limited = h.orchestrator.execute(&second).await;

    assert_eq!(limited, Err(PipelineError::RateLimited));
    assert_eq!(h.quotes.calls(), 3);
    assert_eq!(h.executor.call_count(), 1);
    assert!(h.orchestrator.preview(&second).unwrap().is_some());
}

#[tokio::test]
async fn ttl_seconds_reflects_configuration() {
    let mut config = config::relaxed();
    config.confirmation.ttl_secs = 90;
    let h = Harness::with_config(config);

    assert_eq!(h.orchestrator.ttl_seconds(), 90);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn replicas_sharing_sqlite_execute_once() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shared.db");
    let a = Harness::with_executor_and_config(
        RecordingExecutor::new().with_delay(Duration::from_millis(50)),
        config::sqlite(&path),
    );
    let b = Harness::with_executor_and_config(
        RecordingExecutor::new().with_delay(Duration::from_millis(50)),
        config::sqlite(&path),
    );
    let id = open(&a, "u1").await;

    let on_a = {
        let orchestrator = Arc::clone(&a.orchestrator);
        let id = id.clone();
        tokio::spawn(async move { orchestrator.execute(&id).await })
    };
    let on_b = {
        let orchestrator = Arc::clone(&b.orchestrator);
        let id = id.clone();
        tokio::spawn(async move { orchestrator.execute(&id).await })
    };
    let results = [on_a.await.unwrap(), on_b.await.unwrap()];

    let settled = results
        .iter()
        .filter(|r| matches!(r, Ok(o) if o.is_settled()))
        .count();
    assert_eq!(settled, 1);
    assert_eq!(a.executor.call_count() + b.executor.call_count(), 1);
}
