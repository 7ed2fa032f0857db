//! # Operation Model
//!
//! Validated value types shared by every layer of the core. Each identifier
//! is a newtype whose constructor enforces the storage-level constraints, so
//! an `OpId` or `Domain` in hand is always well-formed.

pub mod ids;
pub mod idempotency_key;
pub mod payload;

pub use idempotency_key::IdempotencyKey;
pub use ids::{BizKey, Domain, EventType, IdemKey, OpId};
pub use payload::Payload;
