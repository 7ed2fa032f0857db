//! # Queue Worker Runner
//!
//! Asynchronous worker loop: dequeues envelopes from the Bus, drives each
//! attempt through the protection chain, and settles the outcome against
//! the Store:
//!
//! - `Ok` — write-ahead **then** finalize **then** ack. The ordering is the
//!   crash-recovery guarantee: if the process dies between write-ahead and
//!   finalize, the Finalizer completes the operation from the recorded
//!   outcome.
//! - `Retry` — republish with exponential backoff while budget remains,
//!   finalize failed once the budget is exhausted.
//! - `Fail` — finalize failed, copy to the DLQ when enabled.
//! - any processing error — nack, never ack, so the broker redelivers.
//!
//! Multiple worker instances may pump the same Bus concurrently; duplicate
//! delivery is absorbed by the terminal-state check and executor
//! idempotency.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::config::QueueWorkerConfig;
use crate::contract::Envelope;
use crate::error::{OrchestratorError, Result};
use crate::executor::Executor;
use crate::model::OpId;
use crate::outcome::Outcome;
use crate::protection::ProtectionChain;
use crate::runner::backoff::BackoffCalculator;
use crate::spi::{Bus, Store};
use crate::state_machine::OperationState;

/// Drains the Bus and settles outcomes. Cheap to clone; clones share the
/// concurrency limit.
#[derive(Clone)]
pub struct QueueWorkerRunner {
    bus: Arc<dyn Bus>,
    store: Arc<dyn Store>,
    executor: Arc<dyn Executor>,
    protection: ProtectionChain,
    config: QueueWorkerConfig,
    backoff: BackoffCalculator,
    in_flight: Arc<Semaphore>,
}

impl QueueWorkerRunner {
    pub fn new(
        bus: Arc<dyn Bus>,
        store: Arc<dyn Store>,
        executor: Arc<dyn Executor>,
        config: QueueWorkerConfig,
        backoff: BackoffCalculator,
    ) -> Result<Self> {
        config.validate()?;
        let in_flight = Arc::new(Semaphore::new(config.concurrency));
        Ok(Self {
            bus,
            store,
            executor,
            protection: ProtectionChain::noop(),
            config,
            backoff,
            in_flight,
        })
    }

    /// Replace the default no-op protection chain.
    pub fn with_protection(mut self, protection: ProtectionChain) -> Self {
        self.protection = protection;
        self
    }

    /// Dequeue one batch and hand each envelope to a worker task.
    ///
    /// Returns the number of envelopes dispatched without waiting for them
    /// to finish; the semaphore bounds how many run at once.
    pub async fn pump(&self) -> Result<usize> {
        let envelopes = self.bus.dequeue(self.config.batch_size).await?;
        let dispatched = envelopes.len();

        for envelope in envelopes {
            let worker = self.clone();
            tokio::spawn(async move {
                // Semaphore is never closed, acquire cannot fail.
                let Ok(_permit) = worker.in_flight.clone().acquire_owned().await else {
                    return;
                };
                worker.process_envelope(envelope).await;
            });
        }
        Ok(dispatched)
    }

    /// Dequeue one batch and process it to completion before returning.
    ///
    /// Deterministic variant of [`pump`](Self::pump) for embedders and
    /// tests that need the batch settled when the call returns.
    pub async fn drain_once(&self) -> Result<usize> {
        let envelopes = self.bus.dequeue(self.config.batch_size).await?;
        let count = envelopes.len();
        futures::future::join_all(
            envelopes
                .into_iter()
                .map(|envelope| self.process_envelope(envelope)),
        )
        .await;
        Ok(count)
    }

    /// Process one envelope end to end, nacking on any error. A failure on
    /// one envelope never aborts the rest of the batch.
    async fn process_envelope(&self, envelope: Envelope) {
        if let Err(processing_error) = self.try_process(&envelope).await {
            error!(
                op_id = %envelope.op_id,
                error = %processing_error,
                "envelope processing failed, nacking for redelivery"
            );
            if let Err(nack_error) = self.bus.nack(&envelope).await {
                error!(op_id = %envelope.op_id, error = %nack_error, "nack failed");
            }
        }
    }

    async fn try_process(&self, envelope: &Envelope) -> Result<()> {
        let op_id = &envelope.op_id;

        // Duplicate delivery of a settled operation: the external side
        // effect already happened exactly once, just drop the message.
        if let Ok(state) = self.store.state(op_id).await {
            if state.is_terminal() {
                debug!(op_id = %op_id, %state, "duplicate delivery of terminal operation, acking");
                return self.bus.ack(envelope).await;
            }
        }

        self.store.mark_in_progress(op_id).await?;
        self.protection
            .execute(self.executor.as_ref(), envelope)
            .await?;
        self.wait_for_attempt(envelope).await?;

        let outcome = self.executor.outcome(op_id).await?;
        self.handle_outcome(op_id, &outcome, envelope).await?;
        self.bus.ack(envelope).await
    }

    async fn handle_outcome(
        &self,
        op_id: &OpId,
        outcome: &Outcome,
        envelope: &Envelope,
    ) -> Result<()> {
        match outcome {
            Outcome::Ok { .. } => self.handle_ok(op_id, outcome).await,
            Outcome::Retry {
                reason,
                attempt,
                backoff_ms,
            } => {
                self.handle_retry(op_id, envelope, reason, *attempt, *backoff_ms)
                    .await
            }
            Outcome::Fail { code, reason, .. } => {
                self.handle_fail(op_id, outcome, envelope, code, reason)
                    .await
            }
        }
    }

    /// Write-ahead, then finalize. A finalize failure is tolerated: the WAL
    /// entry stays pending and the Finalizer completes the operation later.
    async fn handle_ok(&self, op_id: &OpId, outcome: &Outcome) -> Result<()> {
        self.store.write_ahead(op_id, outcome).await?;

        match self
            .store
            .finalize(op_id, OperationState::Completed)
            .await
        {
            Ok(()) => {
                info!(op_id = %op_id, "operation completed");
                Ok(())
            }
            Err(error) if error.is_already_finalized() => {
                debug!(op_id = %op_id, "lost finalize race, concurrent worker won");
                Ok(())
            }
            Err(error) => {
                warn!(
                    op_id = %op_id,
                    error = %error,
                    "finalize failed after write-ahead, Finalizer will recover"
                );
                Ok(())
            }
        }
    }

    async fn handle_retry(
        &self,
        op_id: &OpId,
        envelope: &Envelope,
        reason: &str,
        attempt: u32,
        suggested_backoff_ms: u64,
    ) -> Result<()> {
        if attempt < self.config.max_retries {
            // Executor-suggested backoff acts as a lower bound.
            let delay_ms = self.backoff.calculate(attempt).max(suggested_backoff_ms);
            self.bus.publish(envelope, delay_ms).await?;
            info!(
                op_id = %op_id,
                attempt,
                delay_ms,
                reason,
                "retry scheduled, republished with backoff"
            );
            Ok(())
        } else {
            warn!(
                op_id = %op_id,
                attempt,
                max_retries = self.config.max_retries,
                "retry budget exhausted, failing operation"
            );
            self.finalize_failed(op_id).await
        }
    }

    async fn handle_fail(
        &self,
        op_id: &OpId,
        outcome: &Outcome,
        envelope: &Envelope,
        code: &str,
        reason: &str,
    ) -> Result<()> {
        error!(op_id = %op_id, code, reason, "operation permanently failed");
        self.finalize_failed(op_id).await?;
        if self.config.dlq_enabled {
            self.bus.publish_to_dlq(envelope, outcome).await?;
        }
        Ok(())
    }

    async fn finalize_failed(&self, op_id: &OpId) -> Result<()> {
        match self.store.finalize(op_id, OperationState::Failed).await {
            Ok(()) => Ok(()),
            Err(error) if error.is_already_finalized() => {
                debug!(op_id = %op_id, "lost finalize race, concurrent worker won");
                Ok(())
            }
            Err(error) => Err(error),
        }
    }

    /// Poll the executor until the attempt reports terminal, hedging if the
    /// policy asks for it, bounded by `max_processing_time_ms`.
    async fn wait_for_attempt(&self, envelope: &Envelope) -> Result<()> {
        let op_id = &envelope.op_id;
        let started = Instant::now();
        let deadline = started + Duration::from_millis(self.config.max_processing_time_ms);
        let polling_interval = Duration::from_millis(self.config.polling_interval_ms);

        let hedge = self.protection.hedge();
        let mut hedges_sent = 0u32;

        loop {
            let state = self.executor.state(op_id).await?;
            if state.is_terminal() {
                hedge.record_success(op_id, hedges_sent > 0);
                return Ok(());
            }

            if hedge.should_hedge(op_id)
                && hedges_sent < hedge.max_hedges(op_id)
                && started.elapsed() >= hedge.hedge_delay(op_id)
            {
                hedges_sent += 1;
                hedge.record_hedge_attempt(op_id, hedges_sent);
                debug!(op_id = %op_id, hedge_number = hedges_sent, "sending hedge attempt");
                self.executor.execute(envelope).await?;
            }

            if Instant::now() >= deadline {
                return Err(OrchestratorError::Execution(format!(
                    "attempt for {op_id} did not finish within {}ms",
                    self.config.max_processing_time_ms
                )));
            }
            tokio::time::sleep(polling_interval).await;
        }
    }
}
