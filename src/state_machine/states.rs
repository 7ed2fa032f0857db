use serde::{Deserialize, Serialize};
use std::fmt;

/// Operation lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationState {
    /// Accepted and persisted, not yet dispatched
    Pending,
    /// Dispatched to a worker, external call possibly in flight
    InProgress,
    /// External call succeeded and the operation was finalized
    Completed,
    /// Operation permanently failed
    Failed,
}

impl OperationState {
    /// Check if this is a terminal state (no further transitions allowed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Check if this is an active state (operation is being processed)
    pub fn is_active(&self) -> bool {
        matches!(self, Self::InProgress)
    }
}

impl fmt::Display for OperationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for OperationState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("Invalid operation state: {s}")),
        }
    }
}

/// Write-ahead log entry states.
///
/// `Pending` marks an outcome that was durably recorded but whose operation
/// was never finalized; the Finalizer sweeps these after a crash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteAheadState {
    /// Outcome recorded, finalize not yet confirmed
    Pending,
    /// Finalize succeeded, entry is eligible for purging
    Completed,
}

impl WriteAheadState {
    /// Check if the entry still needs Finalizer attention
    pub fn requires_finalization(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

impl fmt::Display for WriteAheadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Completed => write!(f, "completed"),
        }
    }
}
