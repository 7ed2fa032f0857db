//! Composite idempotency key.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::{BizKey, Domain, EventType, IdemKey};

/// `(domain, event_type, biz_key, idem_key)` tuple identifying one logical
/// submission.
///
/// The invariant the whole system rests on: a given `IdempotencyKey` resolves
/// to exactly one [`OpId`](super::OpId) for the life of the system, enforced
/// by [`IdempotencyManager`](crate::spi::IdempotencyManager) implementations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdempotencyKey {
    pub domain: Domain,
    pub event_type: EventType,
    pub biz_key: BizKey,
    pub idem_key: IdemKey,
}

impl IdempotencyKey {
    pub fn new(domain: Domain, event_type: EventType, biz_key: BizKey, idem_key: IdemKey) -> Self {
        Self {
            domain,
            event_type,
            biz_key,
            idem_key,
        }
    }
}

impl fmt::Display for IdempotencyKey {
    // Used in log fields, keep it compact and unambiguous.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.domain, self.event_type, self.biz_key, self.idem_key
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(idem: &str) -> IdempotencyKey {
        IdempotencyKey::new(
            Domain::new("TEST").unwrap(),
            EventType::new("CREATE").unwrap(),
            BizKey::new("BIZ-001").unwrap(),
            IdemKey::new(idem).unwrap(),
        )
    }

    #[test]
    fn equal_fields_hash_and_compare_equal() {
        assert_eq!(key("IDEM-001"), key("IDEM-001"));
        assert_ne!(key("IDEM-001"), key("IDEM-002"));
    }

    #[test]
    fn display_joins_components() {
        assert_eq!(key("IDEM-001").to_string(), "TEST/CREATE/BIZ-001/IDEM-001");
    }
}
