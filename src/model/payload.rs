//! Opaque operation payload.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Free-form payload carried by a [`Command`](crate::contract::Command).
///
/// The core never inspects the contents; adapters decide the encoding.
/// Empty payloads are legal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Payload(String);

impl Payload {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn empty() -> Self {
        Self(String::new())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Payload contents may be sensitive, only the size is printed.
        write!(f, "Payload({} bytes)", self.0.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_payload_is_empty() {
        assert!(Payload::empty().is_empty());
        assert!(!Payload::new("{}").is_empty());
    }

    #[test]
    fn display_hides_contents() {
        let p = Payload::new("secret");
        assert_eq!(p.to_string(), "Payload(6 bytes)");
    }
}
