//! Venue namespace and session identifiers

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Isolation namespace; every collection and identity is scoped to one venue
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Venue(String);

impl Venue {
    /// Parse a venue slug, rejecting blank input
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Venue {
    fn default() -> Self {
        Self(crate::config::DEFAULT_VENUE.to_string())
    }
}

impl std::fmt::Display for Venue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ephemeral per-process session id. Never persisted across restarts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_venue_parse_trims_and_rejects_blank() {
        assert_eq!(Venue::parse("  alpha ").unwrap().as_str(), "alpha");
        assert!(Venue::parse("   ").is_none());
        assert!(Venue::parse("").is_none());
    }

    #[test]
    fn test_session_ids_are_fresh() {
        assert_ne!(SessionId::new(), SessionId::new());
    }
}
