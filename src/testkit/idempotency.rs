//! In-memory reference implementation of the [`IdempotencyManager`] port.

use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::Result;
use crate::model::{IdempotencyKey, OpId};
use crate::spi::IdempotencyManager;

/// Concurrent-map backed key registry. `get_or_create` is atomic through the
/// map's entry lock, so racing callers with the same key always converge on
/// one [`OpId`].
#[derive(Debug, Default)]
pub struct InMemoryIdempotencyManager {
    keys: DashMap<IdempotencyKey, OpId>,
}

impl InMemoryIdempotencyManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered keys. Test accessor.
    pub fn key_count(&self) -> usize {
        self.keys.len()
    }
}

#[async_trait]
impl IdempotencyManager for InMemoryIdempotencyManager {
    async fn get_or_create(&self, key: &IdempotencyKey) -> Result<OpId> {
        Ok(self
            .keys
            .entry(key.clone())
            .or_insert_with(OpId::generate)
            .clone())
    }

    async fn find(&self, key: &IdempotencyKey) -> Result<Option<OpId>> {
        Ok(self.keys.get(key).map(|op_id| op_id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::test_command;

    #[tokio::test]
    async fn same_key_resolves_to_same_op_id() {
        let manager = InMemoryIdempotencyManager::new();
        let key = test_command("BIZ-001", "IDEM-001").idempotency_key();
        let first = manager.get_or_create(&key).await.unwrap();
        let second = manager.get_or_create(&key).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(manager.key_count(), 1);
    }

    #[tokio::test]
    async fn different_keys_get_distinct_op_ids() {
        let manager = InMemoryIdempotencyManager::new();
        let a = test_command("BIZ-001", "IDEM-001").idempotency_key();
        let b = test_command("BIZ-001", "IDEM-002").idempotency_key();
        assert_ne!(
            manager.get_or_create(&a).await.unwrap(),
            manager.get_or_create(&b).await.unwrap()
        );
    }

    #[tokio::test]
    async fn find_never_creates() {
        let manager = InMemoryIdempotencyManager::new();
        let key = test_command("BIZ-001", "IDEM-001").idempotency_key();
        assert_eq!(manager.find(&key).await.unwrap(), None);
        assert_eq!(manager.key_count(), 0);

        let created = manager.get_or_create(&key).await.unwrap();
        assert_eq!(manager.find(&key).await.unwrap(), Some(created));
    }
}
