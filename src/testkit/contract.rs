//! Fixtures and portable contract suites for SPI implementations.
//!
//! Adapter crates run these suites against their own Store/Bus/Idempotency
//! implementations; the in-memory adapters in this module pass them too,
//! which keeps the suites honest. Every check panics on violation so the
//! suites slot directly into `#[tokio::test]` functions.

use std::sync::Arc;
use std::time::Duration;

use crate::contract::{Command, Envelope};
use crate::model::{BizKey, Domain, EventType, IdemKey, OpId, Payload};
use crate::outcome::Outcome;
use crate::spi::{Bus, IdempotencyManager, Store};
use crate::state_machine::{OperationState, WriteAheadState};

/// Command in the `TEST`/`CREATE` namespace with a small JSON payload.
pub fn test_command(biz_key: &str, idem_key: &str) -> Command {
    test_command_in("TEST", "CREATE", biz_key, idem_key)
}

/// Command with explicit domain and event type.
pub fn test_command_in(domain: &str, event_type: &str, biz_key: &str, idem_key: &str) -> Command {
    Command::new(
        Domain::new(domain).expect("valid domain"),
        EventType::new(event_type).expect("valid event type"),
        BizKey::new(biz_key).expect("valid biz key"),
        IdemKey::new(idem_key).expect("valid idem key"),
        Some(Payload::new("{\"amount\":100}")),
    )
}

/// Envelope around [`test_command`] with a fresh [`OpId`].
pub fn test_envelope(biz_key: &str, idem_key: &str) -> Envelope {
    Envelope::now(OpId::generate(), test_command(biz_key, idem_key), 0)
}

/// Store contract: accept idempotency, lifecycle enforcement, WAL behavior
/// and stuck-operation scans.
pub async fn assert_store_contract(store: Arc<dyn Store>) {
    // accept is idempotent per op id
    let op_id = OpId::generate();
    let command = test_command("CONTRACT-1", "IDEM-1");
    let first = store.accept(&op_id, &command).await.expect("accept");
    let second = store.accept(&op_id, &command).await.expect("re-accept");
    assert_eq!(first, second, "re-accept must return the original envelope");
    assert_eq!(
        store.state(&op_id).await.expect("state"),
        OperationState::Pending
    );
    assert_eq!(store.envelope(&op_id).await.expect("envelope"), first);

    // mark_in_progress tolerates redelivery
    store.mark_in_progress(&op_id).await.expect("mark");
    store.mark_in_progress(&op_id).await.expect("re-mark");
    assert_eq!(
        store.state(&op_id).await.expect("state"),
        OperationState::InProgress
    );

    // write-ahead entries stay pending until finalize
    let outcome = Outcome::ok("txn-contract", None);
    store.write_ahead(&op_id, &outcome).await.expect("wal");
    let pending = store
        .scan_write_ahead(WriteAheadState::Pending, 100)
        .await
        .expect("scan wal");
    assert!(pending.contains(&op_id), "WAL entry must be pending");
    assert_eq!(
        store.write_ahead_outcome(&op_id).await.expect("wal outcome"),
        outcome
    );

    // finalize rejects non-terminal targets, then goes terminal exactly once
    let non_terminal = store.finalize(&op_id, OperationState::InProgress).await;
    assert!(non_terminal.is_err(), "non-terminal finalize must fail");

    store
        .finalize(&op_id, OperationState::Completed)
        .await
        .expect("finalize");
    assert_eq!(
        store.state(&op_id).await.expect("state"),
        OperationState::Completed
    );
    let pending = store
        .scan_write_ahead(WriteAheadState::Pending, 100)
        .await
        .expect("scan wal");
    assert!(!pending.contains(&op_id), "finalize must complete the WAL entry");

    let double = store
        .finalize(&op_id, OperationState::Failed)
        .await
        .expect_err("double finalize must fail");
    assert!(double.is_already_finalized(), "expected AlreadyFinalized, got {double}");

    // unknown ids fail loudly
    let unknown = OpId::generate();
    assert!(store.state(&unknown).await.is_err());
    assert!(store.envelope(&unknown).await.is_err());
    assert!(store.write_ahead_outcome(&unknown).await.is_err());
}

/// Store contract addendum: stuck-operation scans respect the threshold.
/// Waits ~60ms of real time.
pub async fn assert_store_scan_contract(store: Arc<dyn Store>) {
    let op_id = OpId::generate();
    store
        .accept(&op_id, &test_command("CONTRACT-SCAN", "IDEM-1"))
        .await
        .expect("accept");
    store.mark_in_progress(&op_id).await.expect("mark");

    let fresh = store.scan_in_progress(10_000, 100).await.expect("scan");
    assert!(!fresh.contains(&op_id), "operation is not stuck yet");

    tokio::time::sleep(Duration::from_millis(60)).await;
    let stuck = store.scan_in_progress(30, 100).await.expect("scan");
    assert!(stuck.contains(&op_id), "operation must be reported as stuck");

    store
        .finalize(&op_id, OperationState::Failed)
        .await
        .expect("finalize");
    let after = store.scan_in_progress(30, 100).await.expect("scan");
    assert!(!after.contains(&op_id), "terminal operations never show up");
}

/// Bus contract: delivery, delay, redelivery on nack, idempotent ack and
/// dead-lettering. Waits ~60ms of real time for the delay check.
pub async fn assert_bus_contract(bus: Arc<dyn Bus>) {
    // immediate publish is delivered once
    let envelope = test_envelope("CONTRACT-BUS", "IDEM-1");
    bus.publish(&envelope, 0).await.expect("publish");
    let delivered = bus.dequeue(10).await.expect("dequeue");
    assert!(delivered.contains(&envelope), "published envelope delivered");
    assert!(
        bus.dequeue(10).await.expect("dequeue").is_empty(),
        "in-flight envelope is invisible"
    );

    // nack puts it back
    bus.nack(&envelope).await.expect("nack");
    let redelivered = bus.dequeue(10).await.expect("dequeue");
    assert!(redelivered.contains(&envelope), "nacked envelope redelivered");

    // ack is final and idempotent
    bus.ack(&envelope).await.expect("ack");
    bus.ack(&envelope).await.expect("re-ack");
    assert!(bus.dequeue(10).await.expect("dequeue").is_empty());

    // delayed publish is invisible until due
    let delayed = test_envelope("CONTRACT-BUS", "IDEM-2");
    bus.publish(&delayed, 50).await.expect("publish delayed");
    assert!(
        !bus.dequeue(10).await.expect("dequeue").contains(&delayed),
        "delayed envelope must not be visible yet"
    );
    tokio::time::sleep(Duration::from_millis(60)).await;
    let due = bus.dequeue(10).await.expect("dequeue");
    assert!(due.contains(&delayed), "delayed envelope visible after delay");

    // dead-lettered envelopes never come back
    bus.publish_to_dlq(&delayed, &Outcome::fail("E500", "gave up"))
        .await
        .expect("dlq");
    assert!(bus.dequeue(10).await.expect("dequeue").is_empty());
}

/// Idempotency contract: one OpId per key, even under concurrent callers.
pub async fn assert_idempotency_contract(manager: Arc<dyn IdempotencyManager>) {
    let key = test_command("CONTRACT-IDEM", "IDEM-1").idempotency_key();

    assert_eq!(
        manager.find(&key).await.expect("find"),
        None,
        "find must not create"
    );

    let mut handles = Vec::new();
    for _ in 0..16 {
        let manager = Arc::clone(&manager);
        let key = key.clone();
        handles.push(tokio::spawn(
            async move { manager.get_or_create(&key).await },
        ));
    }

    let mut op_ids = Vec::new();
    for handle in handles {
        op_ids.push(handle.await.expect("join").expect("get_or_create"));
    }
    op_ids.dedup();
    assert_eq!(op_ids.len(), 1, "racing callers must converge on one OpId");
    assert_eq!(
        manager.find(&key).await.expect("find"),
        Some(op_ids[0].clone())
    );

    let other = test_command("CONTRACT-IDEM", "IDEM-2").idempotency_key();
    let distinct = manager.get_or_create(&other).await.expect("get_or_create");
    assert_ne!(distinct, op_ids[0], "different keys get different OpIds");
}
