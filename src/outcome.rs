//! # Attempt Outcomes
//!
//! Result of one execution attempt against the external system. Modeled as
//! a tagged union so every consumer matches exhaustively; boolean flags
//! cannot represent the Retry arm faithfully.

use serde::{Deserialize, Serialize};

use crate::model::Payload;
use crate::state_machine::OperationState;

/// Result of one execution attempt, produced by the
/// [`Executor`](crate::executor::Executor) and persisted via write-ahead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Outcome {
    /// The external call succeeded.
    Ok {
        /// Transaction id assigned by the external provider.
        provider_txn_id: String,
        /// Optional response body for the caller.
        payload: Option<Payload>,
    },
    /// The attempt failed transiently and may be retried.
    Retry {
        reason: String,
        /// Attempt number that produced this outcome, starting at 1.
        attempt: u32,
        /// Executor-suggested minimum delay before the next attempt.
        backoff_ms: u64,
    },
    /// The attempt failed permanently.
    Fail {
        code: String,
        reason: String,
        /// Optional underlying cause for diagnostics.
        cause: Option<String>,
    },
}

impl Outcome {
    pub fn ok(provider_txn_id: impl Into<String>, payload: Option<Payload>) -> Self {
        Self::Ok {
            provider_txn_id: provider_txn_id.into(),
            payload,
        }
    }

    pub fn retry(reason: impl Into<String>, attempt: u32, backoff_ms: u64) -> Self {
        Self::Retry {
            reason: reason.into(),
            attempt,
            backoff_ms,
        }
    }

    pub fn fail(code: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Fail {
            code: code.into(),
            reason: reason.into(),
            cause: None,
        }
    }

    pub fn fail_with_cause(
        code: impl Into<String>,
        reason: impl Into<String>,
        cause: impl Into<String>,
    ) -> Self {
        Self::Fail {
            code: code.into(),
            reason: reason.into(),
            cause: Some(cause.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok { .. })
    }

    pub fn is_retry(&self) -> bool {
        matches!(self, Self::Retry { .. })
    }

    pub fn is_fail(&self) -> bool {
        matches!(self, Self::Fail { .. })
    }

    /// Terminal operation state this outcome maps to, if any.
    ///
    /// `Retry` maps to none: the operation stays in flight until its retry
    /// budget resolves it one way or the other.
    pub fn terminal_state(&self) -> Option<OperationState> {
        match self {
            Self::Ok { .. } => Some(OperationState::Completed),
            Self::Fail { .. } => Some(OperationState::Failed),
            Self::Retry { .. } => None,
        }
    }
}
