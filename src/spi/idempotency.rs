//! Idempotency port: stable `IdempotencyKey -> OpId` mapping.

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{IdempotencyKey, OpId};

/// Maps each [`IdempotencyKey`] to exactly one [`OpId`] for the life of the
/// system.
///
/// `get_or_create` must be atomic under concurrent callers with the same
/// key: exactly one OpId is ever created per key. Database unique
/// constraints, optimistic locking or a concurrent map's atomic
/// get-or-create all satisfy this; the atomicity is the contract, not the
/// data structure.
#[async_trait]
pub trait IdempotencyManager: Send + Sync {
    /// Return the existing OpId for `key`, creating one if absent.
    async fn get_or_create(&self, key: &IdempotencyKey) -> Result<OpId>;

    /// Lookup only, never creates.
    async fn find(&self, key: &IdempotencyKey) -> Result<Option<OpId>>;
}
