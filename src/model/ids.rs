//! Identifier newtypes with construction-time validation.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::{OrchestratorError, Result};

fn validate_length(kind: &str, value: &str, max: usize) -> Result<()> {
    if value.trim().is_empty() {
        return Err(OrchestratorError::Validation(format!(
            "{kind} cannot be blank"
        )));
    }
    if value.len() > max {
        return Err(OrchestratorError::Validation(format!(
            "{kind} length cannot exceed {max} characters (current: {})",
            value.len()
        )));
    }
    Ok(())
}

fn validate_upper_snake(kind: &str, value: &str) -> Result<()> {
    if !value
        .chars()
        .all(|c| c.is_ascii_uppercase() || c == '_')
    {
        return Err(OrchestratorError::Validation(format!(
            "{kind} must contain only uppercase letters and underscores (current: {value})"
        )));
    }
    Ok(())
}

/// Globally unique identifier of one orchestrated operation.
///
/// Created once per [`IdempotencyKey`](super::IdempotencyKey) and stable for
/// the lifetime of the operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OpId(String);

impl OpId {
    /// Maximum accepted length of an operation id.
    pub const MAX_LEN: usize = 255;

    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        validate_length("OpId", &value, Self::MAX_LEN)?;
        if !value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(OrchestratorError::Validation(format!(
                "OpId contains invalid characters, only alphanumeric, hyphen and underscore are allowed (current: {value})"
            )));
        }
        Ok(Self(value))
    }

    /// Create a fresh random operation id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OpId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Business domain an operation belongs to (e.g. `PAYMENT`, `SHIPMENT`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Domain(String);

impl Domain {
    pub const MAX_LEN: usize = 50;

    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        validate_length("Domain", &value, Self::MAX_LEN)?;
        validate_upper_snake("Domain", &value)?;
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Event type within a domain (e.g. `CREATE`, `REFUND`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventType(String);

impl EventType {
    pub const MAX_LEN: usize = 50;

    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        validate_length("EventType", &value, Self::MAX_LEN)?;
        validate_upper_snake("EventType", &value)?;
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Business correlation key (order number, invoice id, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BizKey(String);

impl BizKey {
    pub const MAX_LEN: usize = 100;

    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        validate_length("BizKey", &value, Self::MAX_LEN)?;
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BizKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Caller-supplied idempotency key distinguishing logical submissions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdemKey(String);

impl IdemKey {
    pub const MAX_LEN: usize = 255;

    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        validate_length("IdemKey", &value, Self::MAX_LEN)?;
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn op_id_accepts_uuid_and_rejects_junk() {
        assert!(OpId::new(Uuid::new_v4().to_string()).is_ok());
        assert!(OpId::new("op_123-ABC").is_ok());
        assert!(OpId::new("").is_err());
        assert!(OpId::new("   ").is_err());
        assert!(OpId::new("has space").is_err());
        assert!(OpId::new("éclair").is_err());
        assert!(OpId::new("x".repeat(256)).is_err());
    }

    #[test]
    fn generated_op_ids_are_unique_and_valid() {
        let a = OpId::generate();
        let b = OpId::generate();
        assert_ne!(a, b);
        assert!(OpId::new(a.as_str()).is_ok());
    }

    #[test]
    fn domain_requires_upper_snake() {
        assert!(Domain::new("PAYMENT").is_ok());
        assert!(Domain::new("ORDER_SYNC").is_ok());
        assert!(Domain::new("payment").is_err());
        assert!(Domain::new("PAY-MENT").is_err());
        assert!(Domain::new("D".repeat(51)).is_err());
    }

    #[test]
    fn keys_enforce_length_caps() {
        assert!(BizKey::new("BIZ-001").is_ok());
        assert!(BizKey::new("b".repeat(101)).is_err());
        assert!(IdemKey::new("IDEM-001").is_ok());
        assert!(IdemKey::new("i".repeat(256)).is_err());
    }

    #[test]
    fn serde_is_transparent() {
        let id = OpId::new("op-1").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"op-1\"");
        let back: OpId = serde_json::from_str("\"op-1\"").unwrap();
        assert_eq!(back, id);
    }
}
