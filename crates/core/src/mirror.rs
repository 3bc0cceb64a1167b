//! Optional durable mirror
//!
//! Profile and chat writes may be forwarded to an external durable sink.
//! The engines never read it back; a failing mirror is logged and ignored.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{ChatMessage, Profile, SessionId, Venue};

/// Write-only sink for profile and chat changes
pub trait Mirror: Send + Sync {
    fn put_profile(&self, venue: &Venue, id: SessionId, profile: &Profile) -> Result<()>;
    fn put_message(&self, venue: &Venue, message: &ChatMessage) -> Result<()>;
    fn remove_message(&self, venue: &Venue, id: Uuid) -> Result<()>;
}

#[derive(Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum MirrorRecord<'a> {
    PutProfile {
        path: String,
        profile: &'a Profile,
    },
    PutMessage {
        path: String,
        message: &'a ChatMessage,
    },
    RemoveMessage {
        path: String,
    },
}

/// Appends one JSON line per write, keyed by `profiles/<venue>/<id>` and
/// `chat/<venue>/<id>` paths
pub struct JsonlMirror {
    file: Mutex<File>,
}

impl JsonlMirror {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }

    fn append(&self, record: &MirrorRecord<'_>) -> Result<()> {
        let mut line = serde_json::to_value(record)?;
        line["mirroredAt"] = Utc::now().timestamp_millis().into();
        let mut file = self.file.lock().unwrap_or_else(|e| e.into_inner());
        writeln!(file, "{}", line)?;
        Ok(())
    }
}

impl Mirror for JsonlMirror {
    fn put_profile(&self, venue: &Venue, id: SessionId, profile: &Profile) -> Result<()> {
        self.append(&MirrorRecord::PutProfile {
            path: format!("profiles/{}/{}", venue, id),
            profile,
        })
    }

    fn put_message(&self, venue: &Venue, message: &ChatMessage) -> Result<()> {
        self.append(&MirrorRecord::PutMessage {
            path: format!("chat/{}/{}", venue, message.id),
            message,
        })
    }

    fn remove_message(&self, venue: &Venue, id: Uuid) -> Result<()> {
        self.append(&MirrorRecord::RemoveMessage {
            path: format!("chat/{}/{}", venue, id),
        })
    }
}

/// Hand a write to the mirror, if one is configured; failures are only logged
pub(crate) fn forward<F>(mirror: Option<&Arc<dyn Mirror>>, what: &'static str, write: F)
where
    F: FnOnce(&dyn Mirror) -> Result<()>,
{
    if let Some(mirror) = mirror {
        if let Err(e) = write(mirror.as_ref()) {
            warn!(what, error = %e, "Mirror write failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_jsonl_mirror_appends_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mirror.jsonl");
        let mirror = JsonlMirror::open(&path).unwrap();
        let venue = Venue::parse("alpha").unwrap();

        let message = ChatMessage::new(SessionId::new(), "Fido".into(), "hi".into(), Utc::now());
        mirror.put_message(&venue, &message).unwrap();
        mirror.remove_message(&venue, message.id).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<serde_json::Value> = contents
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["op"], "put_message");
        assert_eq!(lines[0]["path"], format!("chat/alpha/{}", message.id));
        assert_eq!(lines[0]["message"]["text"], "hi");
        assert_eq!(lines[1]["op"], "remove_message");
    }
}
