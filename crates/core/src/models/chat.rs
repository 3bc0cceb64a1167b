//! Chat message model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::SessionId;

/// A moderated chat message in a venue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: Uuid,
    /// Authoring session; the only key that authorizes deletion
    pub owner_id: SessionId,
    pub display_name: String,
    /// Already masked
    pub text: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(owner_id: SessionId, display_name: String, text: String, at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id,
            display_name,
            text,
            at,
        }
    }

    pub fn format_timestamp(&self) -> String {
        self.at.format("%H:%M").to_string()
    }
}
