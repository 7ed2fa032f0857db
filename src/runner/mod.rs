//! # Runners
//!
//! The moving parts built on top of the SPI ports:
//!
//! - [`InlineFastPathRunner`] — synchronous-looking front door with a
//!   bounded polling window
//! - [`QueueWorkerRunner`] — asynchronous worker loop draining the Bus
//! - [`Finalizer`] — crash-recovery sweep over pending WAL entries
//! - [`Reaper`] — reconciliation sweep over stuck in-progress operations
//! - [`BackoffCalculator`] — exponential backoff with bounded jitter
//!
//! Queue worker, Finalizer and Reaper are independent periodic workers and
//! are safe to run as multiple concurrent instances across processes.

pub mod backoff;
pub mod fast_path;
pub mod finalizer;
pub mod queue_worker;
pub mod reaper;

pub use backoff::BackoffCalculator;
pub use fast_path::{
    status_url, InlineFastPathRunner, OperationHandle, MAX_TIME_BUDGET_MS, MIN_TIME_BUDGET_MS,
};
pub use finalizer::{Finalizer, FinalizerReport};
pub use queue_worker::QueueWorkerRunner;
pub use reaper::{Reaper, ReaperReport};
