//! Presence membership model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::SessionId;
use crate::online_threshold;

/// A visitor currently checked in at a venue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    /// Ephemeral session id of the owning process
    pub id: SessionId,
    pub display_name: String,
    pub since: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub last_ping_at: DateTime<Utc>,
}

impl Member {
    pub fn new(id: SessionId, display_name: String, now: DateTime<Utc>) -> Self {
        Self {
            id,
            display_name,
            since: now,
            last_ping_at: now,
        }
    }

    /// Fresh enough to count as present at `now`
    pub fn is_online_at(&self, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.last_ping_at) < online_threshold()
    }
}
