//! # Executor Port
//!
//! The application-provided component that actually performs the external
//! call. The core starts attempts through it and polls it for progress; it
//! never learns what the call is.

use async_trait::async_trait;

use crate::contract::Envelope;
use crate::error::Result;
use crate::model::OpId;
use crate::outcome::Outcome;
use crate::state_machine::OperationState;

/// Executes operations against the external system.
///
/// `execute` starts the attempt and returns without waiting for it; callers
/// poll [`state`](Executor::state) until terminal and then read
/// [`outcome`](Executor::outcome). The reported state is attempt-level and
/// says nothing about operation completion: an attempt that ended in
/// [`Outcome::Retry`] reports terminal here because the attempt is over,
/// yet the operation stays in flight until a later attempt returns `Ok` or
/// `Fail`. Callers deciding completion must inspect the outcome, never the
/// attempt state alone; the operation-level state lives in the
/// [`Store`](crate::spi::Store).
///
/// Implementations must be idempotent per [`OpId`]: a second `execute` for
/// an operation whose attempt already ran must not repeat the external side
/// effect. This is what makes duplicate Bus delivery safe.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Start executing the envelope. Non-blocking: returns once the attempt
    /// has been started, not once it finished.
    async fn execute(&self, envelope: &Envelope) -> Result<()>;

    /// Attempt-level state for the operation.
    async fn state(&self, op_id: &OpId) -> Result<OperationState>;

    /// Outcome of the finished attempt. Only valid once
    /// [`state`](Executor::state) reports terminal.
    async fn outcome(&self, op_id: &OpId) -> Result<Outcome>;
}
