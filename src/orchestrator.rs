//! # Orchestrator
//!
//! Entry point tying the ports together. `start` makes an ambiguous
//! external-call operation unambiguous:
//!
//! 1. resolve the command's [`IdempotencyKey`](crate::model::IdempotencyKey)
//!    to its one-and-only [`OpId`](crate::model::OpId),
//! 2. durably accept the operation (state + outbox envelope, atomic),
//! 3. publish the envelope so the queue workers own its completion,
//! 4. dispatch to the fast path and give the caller a bounded window for a
//!    synchronous answer.
//!
//! Re-submitting the same command lands on the same OpId, the Store returns
//! the existing envelope, and executor idempotency collapses the duplicate
//! attempts — the external side effect happens at most once.

use std::sync::Arc;

use tracing::{debug, info};

use crate::contract::Command;
use crate::error::Result;
use crate::runner::fast_path::{validate_time_budget, InlineFastPathRunner, OperationHandle};
use crate::spi::{Bus, IdempotencyManager, Store};

/// Front door for submitting operations.
#[derive(Clone)]
pub struct Orchestrator {
    idempotency: Arc<dyn IdempotencyManager>,
    store: Arc<dyn Store>,
    bus: Arc<dyn Bus>,
    fast_path: InlineFastPathRunner,
}

impl Orchestrator {
    pub fn new(
        idempotency: Arc<dyn IdempotencyManager>,
        store: Arc<dyn Store>,
        bus: Arc<dyn Bus>,
        fast_path: InlineFastPathRunner,
    ) -> Self {
        Self {
            idempotency,
            store,
            bus,
            fast_path,
        }
    }

    /// Accept, enqueue and (within `time_budget_ms`) poll one operation.
    ///
    /// Budget semantics follow the fast path: 0 returns an async handle
    /// immediately, otherwise the budget must fall in
    /// [[`MIN_TIME_BUDGET_MS`](crate::runner::MIN_TIME_BUDGET_MS),
    /// [`MAX_TIME_BUDGET_MS`](crate::runner::MAX_TIME_BUDGET_MS)].
    pub async fn start(&self, command: Command, time_budget_ms: u64) -> Result<OperationHandle> {
        // Reject bad input before anything is persisted or enqueued.
        validate_time_budget(time_budget_ms)?;

        let key = command.idempotency_key();
        let op_id = self.idempotency.get_or_create(&key).await?;
        debug!(op_id = %op_id, key = %key, "resolved operation id");

        let envelope = self.store.accept(&op_id, &command).await?;
        self.bus.publish(&envelope, 0).await?;
        info!(op_id = %op_id, seq = envelope.seq, "operation accepted and enqueued");

        self.fast_path.dispatch(&envelope, time_budget_ms).await
    }
}
