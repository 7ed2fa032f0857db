//! Scriptable [`Executor`] stub.
//!
//! Outcomes are scripted per business key and consumed one per attempt. An
//! unscripted operation succeeds with a synthetic provider transaction id.
//! The stub enforces the executor contract the core depends on: per-OpId
//! idempotency, so redelivered envelopes never repeat the external call,
//! except that an attempt which ended in [`Outcome::Retry`] may run again.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;

use crate::contract::Envelope;
use crate::error::{OrchestratorError, Result};
use crate::executor::Executor;
use crate::model::OpId;
use crate::outcome::Outcome;

#[derive(Debug, Clone)]
enum Attempt {
    InFlight,
    Done(Outcome),
}

/// Deterministic executor for tests: no external calls, scripted outcomes,
/// configurable completion delay.
#[derive(Debug, Clone, Default)]
pub struct StubExecutor {
    delay: Duration,
    scripts: Arc<Mutex<std::collections::HashMap<String, VecDeque<Outcome>>>>,
    attempts: Arc<DashMap<OpId, Attempt>>,
    executions: Arc<AtomicUsize>,
}

impl StubExecutor {
    /// Executor that completes attempts immediately.
    pub fn new() -> Self {
        Self::default()
    }

    /// Executor whose attempts take `delay` to reach a terminal state.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    /// Script the outcomes for a business key, consumed one per attempt in
    /// order. Once the script runs dry the default success outcome applies.
    pub fn script(&self, biz_key: &str, outcomes: Vec<Outcome>) {
        self.scripts
            .lock()
            .entry(biz_key.to_string())
            .or_default()
            .extend(outcomes);
    }

    /// External calls actually performed. Duplicate deliveries collapsed by
    /// idempotency do not count.
    pub fn execution_count(&self) -> usize {
        self.executions.load(Ordering::SeqCst)
    }

    fn next_outcome(&self, envelope: &Envelope) -> Outcome {
        let mut scripts = self.scripts.lock();
        scripts
            .get_mut(envelope.command.biz_key.as_str())
            .and_then(|queue| queue.pop_front())
            .unwrap_or_else(|| Outcome::ok(format!("txn-{}", envelope.op_id), None))
    }
}

#[async_trait]
impl Executor for StubExecutor {
    async fn execute(&self, envelope: &Envelope) -> Result<()> {
        // At-most-once per attempt: only a fresh operation or one whose last
        // attempt ended in Retry starts a new external call.
        match self.attempts.entry(envelope.op_id.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(Attempt::InFlight);
            }
            Entry::Occupied(mut existing) => {
                let retryable = matches!(existing.get(), Attempt::Done(o) if o.is_retry());
                if !retryable {
                    return Ok(());
                }
                existing.insert(Attempt::InFlight);
            }
        }

        self.executions.fetch_add(1, Ordering::SeqCst);
        let outcome = self.next_outcome(envelope);

        if self.delay.is_zero() {
            self.attempts
                .insert(envelope.op_id.clone(), Attempt::Done(outcome));
        } else {
            let attempts = Arc::clone(&self.attempts);
            let op_id = envelope.op_id.clone();
            let delay = self.delay;
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                attempts.insert(op_id, Attempt::Done(outcome));
            });
        }
        Ok(())
    }

    async fn state(&self, op_id: &OpId) -> Result<crate::state_machine::OperationState> {
        use crate::state_machine::OperationState;
        match self.attempts.get(op_id).as_deref() {
            Some(Attempt::InFlight) => Ok(OperationState::InProgress),
            Some(Attempt::Done(outcome)) if outcome.is_ok() => Ok(OperationState::Completed),
            Some(Attempt::Done(_)) => Ok(OperationState::Failed),
            None => Err(OrchestratorError::OperationNotFound(op_id.clone())),
        }
    }

    async fn outcome(&self, op_id: &OpId) -> Result<Outcome> {
        match self.attempts.get(op_id).as_deref() {
            Some(Attempt::Done(outcome)) => Ok(outcome.clone()),
            Some(Attempt::InFlight) => Err(OrchestratorError::Execution(format!(
                "attempt for {op_id} is still in flight"
            ))),
            None => Err(OrchestratorError::OperationNotFound(op_id.clone())),
        }
    }
}
