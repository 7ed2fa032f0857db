//! Transition validation for the operation lifecycle.
//!
//! The only legal transitions are `Pending -> InProgress`,
//! `InProgress -> Completed` and `InProgress -> Failed`. Transitions are
//! monotonic: once terminal, an operation never moves again.

use super::states::OperationState;
use crate::error::{OrchestratorError, Result};

/// Validate a requested transition, failing fast and loud on violations.
///
/// Callers racing over the same operation must treat the resulting
/// `InvalidTransition` from a terminal `from` state via
/// [`Store::finalize`](crate::spi::Store::finalize) as evidence of a
/// concurrent winner, not corruption.
pub fn validate_transition(from: OperationState, to: OperationState) -> Result<()> {
    let valid = match from {
        OperationState::Pending => to == OperationState::InProgress,
        OperationState::InProgress => to.is_terminal(),
        OperationState::Completed | OperationState::Failed => false,
    };

    if valid {
        Ok(())
    } else {
        Err(OrchestratorError::InvalidTransition { from, to })
    }
}

/// Validate and return the target state.
pub fn transition(current: OperationState, next: OperationState) -> Result<OperationState> {
    validate_transition(current, next)?;
    Ok(next)
}
