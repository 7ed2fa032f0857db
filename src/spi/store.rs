//! Persistent storage port: operation state + write-ahead log.

use async_trait::async_trait;

use crate::contract::{Command, Envelope};
use crate::error::Result;
use crate::model::OpId;
use crate::outcome::Outcome;
use crate::state_machine::{OperationState, WriteAheadState};

/// Durable storage for operation state, envelopes and the write-ahead log.
///
/// The Store is the single source of truth. Each method must be individually
/// atomic at the storage layer (single-row update with optimistic
/// concurrency is enough); no cross-call transaction spans two methods.
/// All methods must be safe under concurrent callers racing over the same
/// [`OpId`]: the losing racer of a finalize race observes
/// [`AlreadyFinalized`](crate::OrchestratorError::AlreadyFinalized) rather
/// than silent corruption.
///
/// Write-ahead pattern:
///
/// ```text
/// 1. write_ahead(op_id, outcome)   WAL entry created (pending)
/// 2. finalize(op_id, state)        operation goes terminal, WAL completed
/// ```
///
/// A crash between the two steps leaves a pending WAL entry that the
/// [`Finalizer`](crate::runner::Finalizer) recovers.
#[async_trait]
pub trait Store: Send + Sync {
    /// Atomically persist the operation (state `Pending`) and its outbox
    /// envelope, assigning the envelope's monotonic `seq`.
    ///
    /// Idempotent: re-submission of an already-accepted `op_id` returns the
    /// existing envelope without touching state.
    async fn accept(&self, op_id: &OpId, command: &Command) -> Result<Envelope>;

    /// Transition the operation to `InProgress` when a worker picks it up.
    ///
    /// Idempotent re-entry: marking an operation that is already
    /// `InProgress` is a no-op so that at-least-once redelivery does not
    /// trip the state machine. Marking a terminal operation is an error.
    async fn mark_in_progress(&self, op_id: &OpId) -> Result<()>;

    /// Durably record an attempt outcome with WAL state `Pending`, before
    /// finalization and independent of it.
    ///
    /// Later attempts may overwrite the entry until the operation is
    /// finalized.
    async fn write_ahead(&self, op_id: &OpId, outcome: &Outcome) -> Result<()>;

    /// Finalize the operation and mark its WAL entry `Completed`.
    ///
    /// `state` must be terminal, otherwise
    /// [`Validation`](crate::OrchestratorError::Validation) is returned.
    /// Finalizing an already-terminal operation fails with
    /// [`AlreadyFinalized`](crate::OrchestratorError::AlreadyFinalized);
    /// implementations must fail fast and loud, never silently ignore.
    async fn finalize(&self, op_id: &OpId, state: OperationState) -> Result<()>;

    /// Scan WAL entries in the given state, oldest first, up to `batch_size`.
    async fn scan_write_ahead(
        &self,
        state: WriteAheadState,
        batch_size: usize,
    ) -> Result<Vec<OpId>>;

    /// Fetch the recorded outcome regardless of WAL state.
    async fn write_ahead_outcome(&self, op_id: &OpId) -> Result<Outcome>;

    /// Scan operations stuck `InProgress` longer than `timeout_threshold_ms`,
    /// oldest first, up to `batch_size`.
    async fn scan_in_progress(
        &self,
        timeout_threshold_ms: u64,
        batch_size: usize,
    ) -> Result<Vec<OpId>>;

    /// Fetch the envelope recorded at accept-time, for republish scenarios.
    async fn envelope(&self, op_id: &OpId) -> Result<Envelope>;

    /// Current operation state.
    async fn state(&self, op_id: &OpId) -> Result<OperationState>;
}
