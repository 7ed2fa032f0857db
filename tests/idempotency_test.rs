//! End-to-end idempotency: one idempotency key maps to one operation and
//! at most one external side effect, no matter how often or how
//! concurrently the command is submitted.

use std::sync::Arc;

use orchestrator_core::orchestrator::Orchestrator;
use orchestrator_core::runner::InlineFastPathRunner;
use orchestrator_core::testkit::{
    test_command, InMemoryBus, InMemoryIdempotencyManager, InMemoryStore, StubExecutor,
};

struct Harness {
    orchestrator: Orchestrator,
    store: Arc<InMemoryStore>,
    bus: Arc<InMemoryBus>,
    executor: Arc<StubExecutor>,
}

fn harness() -> Harness {
    let store = Arc::new(InMemoryStore::new());
    let bus = Arc::new(InMemoryBus::new());
    let executor = Arc::new(StubExecutor::new());
    let orchestrator = Orchestrator::new(
        Arc::new(InMemoryIdempotencyManager::new()),
        store.clone(),
        bus.clone(),
        InlineFastPathRunner::new(executor.clone()),
    );
    Harness {
        orchestrator,
        store,
        bus,
        executor,
    }
}

#[tokio::test]
async fn resubmission_reuses_the_same_operation() {
    let h = harness();
    let command = test_command("ORDER-001", "IDEM-001");

    let first = h.orchestrator.start(command.clone(), 200).await.unwrap();
    let second = h.orchestrator.start(command, 200).await.unwrap();

    assert_eq!(first.op_id, second.op_id);
    assert_eq!(h.store.operation_count(), 1);
    assert_eq!(h.executor.execution_count(), 1);
    assert!(first.completed_fast);
    assert!(second.completed_fast, "resubmission sees the settled outcome");
}

#[tokio::test]
async fn concurrent_submissions_converge_on_one_op_id() {
    let h = harness();
    let command = test_command("ORDER-002", "IDEM-001");

    let mut handles = Vec::new();
    for _ in 0..16 {
        let orchestrator = h.orchestrator.clone();
        let command = command.clone();
        handles.push(tokio::spawn(async move {
            orchestrator.start(command, 0).await
        }));
    }

    let mut op_ids = Vec::new();
    for handle in handles {
        op_ids.push(handle.await.unwrap().unwrap().op_id);
    }
    op_ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));
    op_ids.dedup();
    assert_eq!(op_ids.len(), 1, "all submissions map to one operation");
    assert_eq!(h.store.operation_count(), 1);
    assert_eq!(
        h.executor.execution_count(),
        1,
        "the external call happened at most once"
    );
}

#[tokio::test]
async fn distinct_idem_keys_are_distinct_operations() {
    let h = harness();
    let first = h
        .orchestrator
        .start(test_command("ORDER-003", "IDEM-001"), 200)
        .await
        .unwrap();
    let second = h
        .orchestrator
        .start(test_command("ORDER-003", "IDEM-002"), 200)
        .await
        .unwrap();

    assert_ne!(first.op_id, second.op_id);
    assert_eq!(h.store.operation_count(), 2);
    assert_eq!(h.executor.execution_count(), 2);
}

#[tokio::test]
async fn invalid_budget_is_rejected_before_any_side_effect() {
    let h = harness();
    let err = h
        .orchestrator
        .start(test_command("ORDER-005", "IDEM-001"), 10)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        orchestrator_core::OrchestratorError::Validation(_)
    ));

    assert_eq!(h.store.operation_count(), 0, "nothing persisted");
    assert_eq!(h.bus.queued_len(), 0, "nothing enqueued");
    assert_eq!(h.executor.execution_count(), 0, "nothing executed");
}

#[tokio::test]
async fn every_accepted_operation_is_enqueued() {
    let h = harness();
    h.orchestrator
        .start(test_command("ORDER-004", "IDEM-001"), 0)
        .await
        .unwrap();
    assert_eq!(h.bus.queued_len(), 1);
}
