//! Application configuration
//!
//! Loaded from TOML; every section is optional. Timing constants are fixed
//! and deliberately not configurable.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;
use crate::models::Venue;

/// Venue used when neither a stored identity nor a hint names one
pub const DEFAULT_VENUE: &str = "siracevizler";

/// Default store watcher poll period
pub const DEFAULT_WATCH_INTERVAL_MS: u64 = 1_000;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub venue: VenueSection,
    pub storage: StorageSection,
    pub moderation: ModerationSection,
    pub sync: SyncSection,
    pub mirror: MirrorSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VenueSection {
    pub default: String,
}

impl Default for VenueSection {
    fn default() -> Self {
        Self {
            default: DEFAULT_VENUE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    /// SQLite file; the app data directory is used when unset
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModerationSection {
    /// Masked in addition to the built-in list
    pub extra_words: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSection {
    /// Off simulates a host without a broadcast primitive
    pub broadcast: bool,
    pub watch_interval_ms: u64,
}

impl Default for SyncSection {
    fn default() -> Self {
        Self {
            broadcast: true,
            watch_interval_ms: DEFAULT_WATCH_INTERVAL_MS,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MirrorSection {
    /// JSON-lines file receiving profile and chat writes
    pub path: Option<PathBuf>,
}

impl Config {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Load from `path`; a missing file yields the defaults
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(raw) => {
                info!(path = %path.display(), "Loaded config");
                Self::from_toml_str(&raw)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Configured default venue, falling back to the built-in one when blank
    pub fn default_venue(&self) -> Venue {
        Venue::parse(&self.venue.default).unwrap_or_default()
    }
}
