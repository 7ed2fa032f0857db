//! # SPI Ports
//!
//! Contracts implemented by adapters and consumed by the runners. Ports are
//! plain traits injected by constructor; the core holds them behind
//! `Arc<dyn _>` and never reaches for a global registry.
//!
//! Every implementation must pass the portable suites in
//! [`testkit::contract`](crate::testkit::contract) before being trusted in
//! production.

pub mod bus;
pub mod idempotency;
pub mod store;

pub use bus::Bus;
pub use idempotency::IdempotencyManager;
pub use store::Store;
