//! # Reaper
//!
//! Periodic reconciliation sweep for operations stuck `InProgress` past a
//! timeout: a crashed worker, a lost message, an executor that never came
//! back. Policy decides the remedy:
//!
//! - [`ReconcileStrategy::Retry`] republishes the stored envelope with zero
//!   delay so a healthy worker picks it up again.
//! - [`ReconcileStrategy::Fail`] finalizes the operation as failed without
//!   touching the Bus.

use std::sync::Arc;

use tracing::{debug, error, info};

use crate::config::{ReaperConfig, ReconcileStrategy};
use crate::error::Result;
use crate::model::OpId;
use crate::spi::{Bus, Store};
use crate::state_machine::OperationState;

/// Summary of one reconciliation scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReaperReport {
    /// Stuck operations found by the scan
    pub scanned: usize,
    /// Operations successfully reconciled
    pub reconciled: usize,
}

/// Reconciles operations stuck `InProgress` longer than the configured
/// threshold.
pub struct Reaper {
    bus: Arc<dyn Bus>,
    store: Arc<dyn Store>,
    config: ReaperConfig,
}

impl Reaper {
    pub fn new(bus: Arc<dyn Bus>, store: Arc<dyn Store>, config: ReaperConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { bus, store, config })
    }

    /// Scan one batch of stuck operations and apply the configured
    /// strategy. Per-item failures are logged and the batch continues.
    pub async fn scan(&self) -> Result<ReaperReport> {
        let stuck = self
            .store
            .scan_in_progress(self.config.timeout_threshold_ms, self.config.batch_size)
            .await?;
        let scanned = stuck.len();

        let mut reconciled = 0;
        for op_id in stuck {
            if self.try_reconcile(&op_id).await {
                reconciled += 1;
            }
        }

        if scanned > 0 {
            info!(scanned, reconciled, strategy = ?self.config.default_strategy, "reaper scan completed");
        } else {
            debug!("reaper scan found nothing stuck");
        }
        Ok(ReaperReport { scanned, reconciled })
    }

    async fn try_reconcile(&self, op_id: &OpId) -> bool {
        let attempt = match self.config.default_strategy {
            ReconcileStrategy::Retry => self.reconcile_retry(op_id).await,
            ReconcileStrategy::Fail => self.reconcile_fail(op_id).await,
        };

        match attempt {
            Ok(()) => {
                info!(op_id = %op_id, strategy = ?self.config.default_strategy, "reaper reconciled operation");
                true
            }
            Err(race) if race.is_already_finalized() => {
                debug!(op_id = %op_id, "already finalized by a concurrent instance");
                true
            }
            Err(reconcile_error) => {
                error!(op_id = %op_id, error = %reconcile_error, "reaper could not reconcile operation");
                false
            }
        }
    }

    /// Fetch the stored envelope and republish it for immediate redelivery.
    async fn reconcile_retry(&self, op_id: &OpId) -> Result<()> {
        let envelope = self.store.envelope(op_id).await?;
        self.bus.publish(&envelope, 0).await
    }

    async fn reconcile_fail(&self, op_id: &OpId) -> Result<()> {
        self.store.finalize(op_id, OperationState::Failed).await
    }
}
