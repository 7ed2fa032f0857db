//! # Finalizer
//!
//! Periodic recovery sweep for the gap the write-ahead log exists to cover:
//! the external call succeeded and its outcome was durably recorded, but
//! the process died before `finalize` committed. Each scan picks up pending
//! WAL entries and finishes the interrupted finalization from the recorded
//! outcome.
//!
//! Scans are idempotent and safe to run from multiple instances at once:
//! a losing racer observes an already-finalized error and moves on, and a
//! fully recovered system yields empty scans.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::config::FinalizerConfig;
use crate::error::Result;
use crate::model::OpId;
use crate::outcome::Outcome;
use crate::spi::Store;
use crate::state_machine::{OperationState, WriteAheadState};

/// Summary of one recovery scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FinalizerReport {
    /// Pending WAL entries found by the scan
    pub scanned: usize,
    /// Entries successfully finalized (including benign lost races)
    pub recovered: usize,
}

/// Completes operations whose WAL entry is pending but never finalized.
pub struct Finalizer {
    store: Arc<dyn Store>,
    config: FinalizerConfig,
}

impl Finalizer {
    pub fn new(store: Arc<dyn Store>, config: FinalizerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { store, config })
    }

    /// Scan one batch of pending WAL entries and finalize each from its
    /// recorded outcome. Per-item failures are logged and the batch
    /// continues.
    pub async fn scan(&self) -> Result<FinalizerReport> {
        let pending = self
            .store
            .scan_write_ahead(WriteAheadState::Pending, self.config.batch_size)
            .await?;
        let scanned = pending.len();

        let mut recovered = 0;
        for op_id in pending {
            if self.try_finalize(&op_id).await {
                recovered += 1;
            }
        }

        if scanned > 0 {
            info!(scanned, recovered, "finalizer scan completed");
        } else {
            debug!("finalizer scan found nothing to recover");
        }
        Ok(FinalizerReport { scanned, recovered })
    }

    async fn try_finalize(&self, op_id: &OpId) -> bool {
        let outcome = match self.store.write_ahead_outcome(op_id).await {
            Ok(outcome) => outcome,
            Err(fetch_error) => {
                error!(op_id = %op_id, error = %fetch_error, "could not read write-ahead outcome");
                return false;
            }
        };

        let target = match outcome {
            Outcome::Ok { .. } => OperationState::Completed,
            Outcome::Fail { .. } => OperationState::Failed,
            Outcome::Retry { .. } => {
                // Retry outcomes are republished, never written ahead. An
                // entry like this means a worker bug upstream; fail the
                // operation rather than leave it stuck.
                warn!(op_id = %op_id, "unexpected retry outcome in write-ahead log, failing operation");
                OperationState::Failed
            }
        };

        match self.store.finalize(op_id, target).await {
            Ok(()) => {
                info!(op_id = %op_id, target = %target, "finalizer recovered operation");
                true
            }
            Err(race) if race.is_already_finalized() => {
                debug!(op_id = %op_id, "already finalized by a concurrent instance");
                true
            }
            Err(finalize_error) => {
                error!(op_id = %op_id, error = %finalize_error, "finalizer could not finalize operation");
                false
            }
        }
    }
}
