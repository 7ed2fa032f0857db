//! # Orchestrator Core
//!
//! Reliable execution semantics for operations that call external,
//! non-transactional systems: exactly-one operation per idempotency key,
//! at-most-one external side effect, and crash recovery through a
//! write-ahead log.
//!
//! ## Architecture
//!
//! The core is a library, not a service. It defines SPI ports
//! ([`spi::Store`], [`spi::Bus`], [`spi::IdempotencyManager`],
//! [`executor::Executor`]) and drives them from a set of runners:
//!
//! - [`orchestrator::Orchestrator`] — front door: resolve the idempotency
//!   key, accept durably, enqueue, then try the fast path
//! - [`runner::InlineFastPathRunner`] — bounded synchronous window over an
//!   asynchronous execution
//! - [`runner::QueueWorkerRunner`] — drains the Bus, applies protection
//!   hooks, writes ahead and finalizes
//! - [`runner::Finalizer`] — recovers operations that crashed between
//!   write-ahead and finalize
//! - [`runner::Reaper`] — reconciles operations stuck in progress
//!
//! ## Reliability Model
//!
//! Every attempt outcome is durably recorded (write-ahead) before the
//! operation goes terminal (finalize). A crash between the two steps leaves
//! a pending WAL entry that the Finalizer replays; finalize is first-writer
//! -wins, so concurrent recovery is safe. Duplicate Bus delivery is expected
//! and neutralized by executor idempotency per [`model::OpId`].
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use orchestrator_core::orchestrator::Orchestrator;
//! use orchestrator_core::runner::InlineFastPathRunner;
//! use orchestrator_core::testkit::{
//!     test_command, InMemoryBus, InMemoryIdempotencyManager, InMemoryStore, StubExecutor,
//! };
//!
//! # async fn demo() -> orchestrator_core::Result<()> {
//! let executor = Arc::new(StubExecutor::new());
//! let orchestrator = Orchestrator::new(
//!     Arc::new(InMemoryIdempotencyManager::new()),
//!     Arc::new(InMemoryStore::new()),
//!     Arc::new(InMemoryBus::new()),
//!     InlineFastPathRunner::new(executor),
//! );
//!
//! let handle = orchestrator
//!     .start(test_command("ORDER-001", "IDEM-001"), 200)
//!     .await?;
//! assert!(handle.completed_fast);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod contract;
pub mod error;
pub mod executor;
pub mod logging;
pub mod model;
pub mod orchestrator;
pub mod outcome;
pub mod protection;
pub mod runner;
pub mod spi;
pub mod state_machine;
pub mod testkit;

pub use config::{
    BackoffConfig, FinalizerConfig, OrchestratorConfig, QueueWorkerConfig, ReaperConfig,
    ReconcileStrategy,
};
pub use contract::{Command, Envelope};
pub use error::{OrchestratorError, Result};
pub use executor::Executor;
pub use model::{BizKey, Domain, EventType, IdemKey, IdempotencyKey, OpId, Payload};
pub use orchestrator::Orchestrator;
pub use outcome::Outcome;
pub use state_machine::{OperationState, WriteAheadState};
