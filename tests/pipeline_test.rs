//! Full pipeline: orchestrator front door, queue worker, and the recovery
//! runners working against the same in-memory adapters.

use std::sync::Arc;
use std::time::Duration;

use orchestrator_core::config::{BackoffConfig, QueueWorkerConfig, ReaperConfig, ReconcileStrategy};
use orchestrator_core::orchestrator::Orchestrator;
use orchestrator_core::runner::{BackoffCalculator, InlineFastPathRunner, QueueWorkerRunner, Reaper};
use orchestrator_core::spi::Store;
use orchestrator_core::testkit::{
    test_command, InMemoryBus, InMemoryIdempotencyManager, InMemoryStore, StubExecutor,
};
use orchestrator_core::{OperationState, Outcome};

struct Pipeline {
    orchestrator: Orchestrator,
    worker: QueueWorkerRunner,
    store: Arc<InMemoryStore>,
    bus: Arc<InMemoryBus>,
    executor: Arc<StubExecutor>,
}

fn pipeline(executor_delay: Duration) -> Pipeline {
    let store = Arc::new(InMemoryStore::new());
    let bus = Arc::new(InMemoryBus::new());
    let executor = Arc::new(StubExecutor::with_delay(executor_delay));

    let orchestrator = Orchestrator::new(
        Arc::new(InMemoryIdempotencyManager::new()),
        store.clone(),
        bus.clone(),
        InlineFastPathRunner::new(executor.clone()),
    );

    let config = QueueWorkerConfig {
        polling_interval_ms: 5,
        max_processing_time_ms: 1_000,
        ..QueueWorkerConfig::default()
    };
    let backoff = BackoffCalculator::new(BackoffConfig {
        base_delay_ms: 1,
        max_delay_ms: 10,
        jitter_factor: 0.0,
    })
    .unwrap();
    let worker =
        QueueWorkerRunner::new(bus.clone(), store.clone(), executor.clone(), config, backoff)
            .unwrap();

    Pipeline {
        orchestrator,
        worker,
        store,
        bus,
        executor,
    }
}

#[tokio::test]
async fn fast_submission_is_settled_by_the_worker() {
    let p = pipeline(Duration::ZERO);
    let handle = p
        .orchestrator
        .start(test_command("ORDER-001", "IDEM-001"), 200)
        .await
        .unwrap();
    assert!(handle.completed_fast);

    // The queued copy of the envelope still flows through the worker, which
    // settles the durable state exactly once.
    p.worker.drain_once().await.unwrap();
    assert_eq!(
        p.store.state(&handle.op_id).await.unwrap(),
        OperationState::Completed
    );
    assert_eq!(p.executor.execution_count(), 1);
}

#[tokio::test]
async fn slow_operation_goes_async_and_completes_in_background() {
    let p = pipeline(Duration::from_millis(150));
    let handle = p
        .orchestrator
        .start(test_command("ORDER-002", "IDEM-001"), 50)
        .await
        .unwrap();
    assert!(!handle.completed_fast);
    assert_eq!(
        handle.status_url.as_deref(),
        Some(format!("/api/operations/{}/status", handle.op_id).as_str())
    );

    p.worker.drain_once().await.unwrap();
    assert_eq!(
        p.store.state(&handle.op_id).await.unwrap(),
        OperationState::Completed
    );
    assert_eq!(p.executor.execution_count(), 1);
}

#[tokio::test]
async fn retry_then_success_settles_through_the_worker() {
    let p = pipeline(Duration::ZERO);
    p.executor.script(
        "ORDER-003",
        vec![
            Outcome::retry("throttled", 1, 0),
            Outcome::ok("txn-final", None),
        ],
    );

    let handle = p
        .orchestrator
        .start(test_command("ORDER-003", "IDEM-001"), 0)
        .await
        .unwrap();

    p.worker.drain_once().await.unwrap();
    tokio::time::sleep(Duration::from_millis(15)).await;
    p.worker.drain_once().await.unwrap();

    assert_eq!(
        p.store.state(&handle.op_id).await.unwrap(),
        OperationState::Completed
    );
    assert_eq!(p.executor.execution_count(), 2);
}

#[tokio::test]
async fn reaped_operation_is_finished_by_a_healthy_worker() {
    let p = pipeline(Duration::ZERO);
    let handle = p
        .orchestrator
        .start(test_command("ORDER-004", "IDEM-001"), 0)
        .await
        .unwrap();

    // A worker picked the message up and died: in progress, nothing queued.
    let envelope = p.store.envelope(&handle.op_id).await.unwrap();
    {
        use orchestrator_core::spi::Bus;
        let taken = p.bus.dequeue(10).await.unwrap();
        assert_eq!(taken, vec![envelope]);
        p.bus.ack(&taken[0]).await.unwrap();
    }
    p.store.mark_in_progress(&handle.op_id).await.unwrap();
    tokio::time::sleep(Duration::from_millis(30)).await;

    let reaper = Reaper::new(
        p.bus.clone(),
        p.store.clone(),
        ReaperConfig {
            timeout_threshold_ms: 20,
            default_strategy: ReconcileStrategy::Retry,
            ..ReaperConfig::default()
        },
    )
    .unwrap();
    assert_eq!(reaper.scan().await.unwrap().reconciled, 1);

    p.worker.drain_once().await.unwrap();
    assert_eq!(
        p.store.state(&handle.op_id).await.unwrap(),
        OperationState::Completed
    );
    assert_eq!(p.executor.execution_count(), 1, "side effect stayed single");
}
