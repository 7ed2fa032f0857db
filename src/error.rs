//! # Structured Error Handling
//!
//! Single error taxonomy shared by the core, the SPI ports, and the runners.
//!
//! The variants mirror the failure classes the orchestration core actually
//! distinguishes at runtime:
//!
//! - **Validation**: bad caller input, fail fast, never retried
//! - **InvalidTransition / AlreadyFinalized**: state-consistency violations
//!   surfaced loudly by Store implementations
//! - **Store / Bus / Execution**: infrastructure failures from the ports
//! - **ProtectionRejected**: call refused by a protection hook

use crate::model::OpId;
use crate::state_machine::OperationState;

/// Errors produced by the orchestration core and its SPI ports.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OrchestratorError {
    /// Caller-supplied input failed validation at the call boundary.
    #[error("validation error: {0}")]
    Validation(String),

    /// A state transition outside the allowed lifecycle was requested.
    #[error("invalid state transition: {from} -> {to}")]
    InvalidTransition {
        from: OperationState,
        to: OperationState,
    },

    /// A terminal operation was asked to transition again.
    ///
    /// Background runners treat this as benign evidence of a concurrent
    /// winner; direct callers must not silently swallow it.
    #[error("operation {op_id} already finalized as {state}")]
    AlreadyFinalized { op_id: OpId, state: OperationState },

    /// No operation is known for the given id.
    #[error("operation not found: {0}")]
    OperationNotFound(OpId),

    /// No write-ahead entry is recorded for the given id.
    #[error("no write-ahead entry for operation: {0}")]
    WriteAheadNotFound(OpId),

    /// No envelope is stored for the given id.
    #[error("no envelope for operation: {0}")]
    EnvelopeNotFound(OpId),

    /// Store adapter failure (connectivity, serialization, constraint).
    #[error("store error: {0}")]
    Store(String),

    /// Bus adapter failure (publish, dequeue, ack/nack).
    #[error("bus error: {0}")]
    Bus(String),

    /// Executor failure while starting or inspecting an attempt.
    #[error("execution error: {0}")]
    Execution(String),

    /// A protection hook refused the call (circuit open, bulkhead full,
    /// rate limit exceeded, per-attempt timeout).
    #[error("rejected by protection hook: {0}")]
    ProtectionRejected(String),

    /// Configuration could not be loaded or failed validation.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl OrchestratorError {
    /// True for the race outcome a losing finalizer is expected to observe.
    pub fn is_already_finalized(&self) -> bool {
        matches!(self, Self::AlreadyFinalized { .. })
    }
}

pub type Result<T> = std::result::Result<T, OrchestratorError>;
