//! Client-supplied visitor identifier.
//!
//! [`VisitorId`] names one logical tracked entity independent of any
//! connection. It is opaque and only checked for non-emptiness; any
//! connection may claim any identifier that is not already bound to it.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::RelayError;

/// Opaque, non-empty visitor identifier.
///
/// Stable across reconnects of the same logical visitor. Used as the key
/// of position records in [`super::SessionRegistry`] and as the payload
/// of `disconnectUser` broadcasts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VisitorId(String);

impl VisitorId {
    /// Parses a raw identifier, rejecting empty strings.
    ///
    /// `event` names the inbound event the identifier came from and is
    /// carried in the error for diagnostics.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::MissingId`] if `raw` is `None` or empty.
    pub fn parse(raw: Option<String>, event: &'static str) -> Result<Self, RelayError> {
        match raw {
            Some(id) if !id.is_empty() => Ok(Self(id)),
            _ => Err(RelayError::MissingId { event }),
        }
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VisitorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VisitorId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_non_empty() {
        let Ok(id) = VisitorId::parse(Some("v1".to_string()), "register") else {
            panic!("expected valid id");
        };
        assert_eq!(id.as_str(), "v1");
    }

    #[test]
    fn parse_rejects_empty_and_absent() {
        assert!(matches!(
            VisitorId::parse(Some(String::new()), "position"),
            Err(RelayError::MissingId { event: "position" })
        ));
        assert!(matches!(
            VisitorId::parse(None, "stopTracking"),
            Err(RelayError::MissingId {
                event: "stopTracking"
            })
        ));
    }

    #[test]
    fn serializes_as_plain_string() {
        let json = serde_json::to_string(&VisitorId::from("alice")).unwrap_or_default();
        assert_eq!(json, "\"alice\"");
    }
}
