//! Recently-present history model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::retention_window;

/// Departure record, appended when a session leaves
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentEntry {
    pub id: Uuid,
    /// Name at the time of departure
    pub display_name: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub at: DateTime<Utc>,
}

impl RecentEntry {
    pub fn new(display_name: String, at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            display_name,
            at,
        }
    }

    /// Still inside the retention window at `now` (inclusive bound)
    pub fn is_retained_at(&self, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.at) <= retention_window()
    }
}
