//! # Inline Fast-Path Runner
//!
//! Synchronous-looking front door: starts the attempt and polls for
//! completion inside a caller-supplied time budget. Completion within
//! budget yields the outcome directly; budget expiry yields a status handle
//! the caller can poll out-of-band.
//!
//! The runner awaits in the caller's task; polling sleeps are the only
//! suspension points and are bounded by the budget. Cancellation is the
//! usual async story: dropping the future abandons the poll loop without
//! leaking state (the queued copy of the envelope still drives the
//! operation to completion).

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::contract::{Command, Envelope};
use crate::error::{OrchestratorError, Result};
use crate::executor::Executor;
use crate::model::OpId;
use crate::outcome::Outcome;

/// Smallest accepted non-zero time budget.
pub const MIN_TIME_BUDGET_MS: u64 = 50;
/// Largest accepted time budget.
pub const MAX_TIME_BUDGET_MS: u64 = 5_000;

const DEFAULT_POLLING_INTERVAL: Duration = Duration::from_millis(10);

/// Caller-facing result of a submission. Not persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationHandle {
    pub op_id: OpId,
    /// Whether the operation went terminal inside the time budget.
    pub completed_fast: bool,
    /// The outcome, present only when `completed_fast`.
    pub response_body: Option<Outcome>,
    /// Polling URL, present only when the budget expired.
    pub status_url: Option<String>,
}

impl OperationHandle {
    /// Handle for an operation that completed inside the budget.
    pub fn completed(op_id: OpId, outcome: Outcome) -> Self {
        Self {
            op_id,
            completed_fast: true,
            response_body: Some(outcome),
            status_url: None,
        }
    }

    /// Handle for an operation that continues asynchronously.
    pub fn asynchronous(op_id: OpId) -> Self {
        let status_url = status_url(&op_id);
        Self {
            op_id,
            completed_fast: false,
            response_body: None,
            status_url: Some(status_url),
        }
    }
}

/// Status endpoint contract consumed by adapters.
pub fn status_url(op_id: &OpId) -> String {
    format!("/api/operations/{op_id}/status")
}

/// Polls the executor for completion inside a bounded time budget.
#[derive(Clone)]
pub struct InlineFastPathRunner {
    executor: Arc<dyn Executor>,
    polling_interval: Duration,
}

impl InlineFastPathRunner {
    pub fn new(executor: Arc<dyn Executor>) -> Self {
        Self {
            executor,
            polling_interval: DEFAULT_POLLING_INTERVAL,
        }
    }

    /// Override the poll interval. Must be positive.
    pub fn with_polling_interval(mut self, polling_interval: Duration) -> Result<Self> {
        if polling_interval.is_zero() {
            return Err(OrchestratorError::Validation(
                "polling interval must be positive".to_string(),
            ));
        }
        self.polling_interval = polling_interval;
        Ok(self)
    }

    /// Submit a standalone command: assigns a fresh [`OpId`], starts the
    /// attempt and polls within `time_budget_ms`.
    ///
    /// Used when the fast path runs without the full orchestrator (no
    /// idempotency lookup, no durable accept).
    pub async fn submit(&self, command: Command, time_budget_ms: u64) -> Result<OperationHandle> {
        validate_time_budget(time_budget_ms)?;
        let envelope = Envelope::now(OpId::generate(), command, 0);
        self.dispatch(&envelope, time_budget_ms).await
    }

    /// Start the attempt for an already-accepted envelope and poll within
    /// `time_budget_ms`. A zero budget skips polling entirely and returns
    /// the async handle immediately.
    pub async fn dispatch(
        &self,
        envelope: &Envelope,
        time_budget_ms: u64,
    ) -> Result<OperationHandle> {
        validate_time_budget(time_budget_ms)?;
        self.executor.execute(envelope).await?;

        if time_budget_ms == 0 {
            debug!(op_id = %envelope.op_id, "zero time budget, returning async handle");
            return Ok(OperationHandle::asynchronous(envelope.op_id.clone()));
        }
        self.poll_for_completion(&envelope.op_id, time_budget_ms)
            .await
    }

    async fn poll_for_completion(
        &self,
        op_id: &OpId,
        time_budget_ms: u64,
    ) -> Result<OperationHandle> {
        let deadline = Instant::now() + Duration::from_millis(time_budget_ms);

        loop {
            let state = self.executor.state(op_id).await?;
            if state.is_terminal() {
                let outcome = self.executor.outcome(op_id).await?;
                // A Retry outcome ends the attempt, not the operation: the
                // queue worker republishes it, so keep waiting for a real
                // terminal outcome.
                if !outcome.is_retry() {
                    debug!(op_id = %op_id, %state, "fast path completed within budget");
                    return Ok(OperationHandle::completed(op_id.clone(), outcome));
                }
            }

            let now = Instant::now();
            if now >= deadline {
                debug!(op_id = %op_id, time_budget_ms, "time budget exhausted, returning async handle");
                return Ok(OperationHandle::asynchronous(op_id.clone()));
            }
            // Clamp the last sleep so the final poll lands on the deadline
            // instead of giving up one interval early.
            tokio::time::sleep(self.polling_interval.min(deadline - now)).await;
        }
    }
}

pub(crate) fn validate_time_budget(time_budget_ms: u64) -> Result<()> {
    // Zero is an explicit async-only submission; anything else must fall
    // inside the fast-path window.
    if time_budget_ms != 0
        && !(MIN_TIME_BUDGET_MS..=MAX_TIME_BUDGET_MS).contains(&time_budget_ms)
    {
        return Err(OrchestratorError::Validation(format!(
            "time_budget_ms must be 0 or between {MIN_TIME_BUDGET_MS} and {MAX_TIME_BUDGET_MS} ms (current: {time_budget_ms})"
        )));
    }
    Ok(())
}
