//! # Test Kit
//!
//! Reference in-memory adapters plus the portable contract suites every
//! Store/Bus/IdempotencyManager implementation must pass before being
//! trusted in production.
//!
//! The adapters are correct, single-process implementations of the SPI
//! ports, useful both as executable documentation of the contracts and as
//! the substrate for this crate's own integration tests. They are not
//! durable and not meant for production.

pub mod bus;
pub mod contract;
pub mod executor;
pub mod idempotency;
pub mod store;

pub use bus::InMemoryBus;
pub use contract::{test_command, test_command_in, test_envelope};
pub use executor::StubExecutor;
pub use idempotency::InMemoryIdempotencyManager;
pub use store::InMemoryStore;
