//! Session-scoped correlation identifiers

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ServiceError};

/// Header carrying the correlation id on every originating call
pub const CORRELATION_HEADER: &str = "CorrelationId";

/// Opaque token linking a batch of remote calls to one client session
///
/// The value is only ever compared and rendered, never interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(String);

impl CorrelationId {
    /// Generate a fresh identifier for a new session
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Wrap an existing token
    pub fn parse(token: impl Into<String>) -> Result<Self> {
        let token = token.into();
        let trimmed = token.trim();

        if trimmed.is_empty() {
            return Err(ServiceError::validation("correlation id must not be empty"));
        }

        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for CorrelationId {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_unique() {
        assert_ne!(CorrelationId::new(), CorrelationId::new());
    }

    #[test]
    fn test_parse_trims_and_rejects_blank() {
        assert_eq!(CorrelationId::parse("  C1 ").unwrap().as_str(), "C1");
        assert!(CorrelationId::parse("   ").is_err());
        assert!("".parse::<CorrelationId>().is_err());
    }
}
