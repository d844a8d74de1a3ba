//! Forecast model identifier.

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ModelError;

/// Identifier a forecast model is stored under on the backend.
///
/// The backend assigns identifiers on first save, so any non-empty string is
/// accepted when parsing. Locally minted identifiers are UUIDv7 strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelId(String);

impl ModelId {
    /// Mint a fresh identifier (time-ordered UUIDv7).
    ///
    /// Prefer passing IDs explicitly in tests for determinism.
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Parse an identifier, rejecting empty or whitespace-only input.
    pub fn parse(raw: impl Into<String>) -> Result<Self, ModelError> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ModelError::invalid_id("ModelId: empty"));
        }
        if trimmed.len() == raw.len() {
            Ok(Self(raw))
        } else {
            Ok(Self(trimmed.to_string()))
        }
    }

    /// Interpret a metadata `uid` field: empty means "not yet assigned".
    pub fn from_uid(uid: &str) -> Option<Self> {
        Self::parse(uid).ok()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl core::fmt::Display for ModelId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ModelId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for ModelId {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<ModelId> for String {
    fn from(value: ModelId) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_rejects_blank_input() {
        assert!(matches!(ModelId::parse(""), Err(ModelError::InvalidId(_))));
        assert!(matches!(ModelId::parse("   "), Err(ModelError::InvalidId(_))));
        assert_eq!(ModelId::from_uid(""), None);
    }

    #[test]
    fn parse_trims_surrounding_whitespace() {
        let id: ModelId = " plan-7 ".parse().unwrap();
        assert_eq!(id.as_str(), "plan-7");
    }

    #[test]
    fn generated_ids_are_distinct_and_parseable() {
        let a = ModelId::generate();
        let b = ModelId::generate();
        assert_ne!(a, b);
        assert_eq!(ModelId::parse(a.to_string()).unwrap(), a);
    }

    #[test]
    fn serializes_as_plain_string() {
        let id = ModelId::parse("m1").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"m1\"");
    }
}
