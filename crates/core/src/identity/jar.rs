//! Where the durable identity cookie lives between runs

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::error::Result;

/// Persistent slot for one cookie line
pub trait TokenJar: Send + Sync {
    fn load(&self) -> Result<Option<String>>;
    fn store(&self, line: &str) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

/// Cookie line kept in a file under the app data directory
#[derive(Debug, Clone)]
pub struct FileTokenJar {
    path: PathBuf,
}

impl FileTokenJar {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenJar for FileTokenJar {
    fn load(&self) -> Result<Option<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(line) => {
                let line = line.trim();
                Ok((!line.is_empty()).then(|| line.to_string()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn store(&self, line: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, line)?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory jar; clones share the slot, which models a restart
#[derive(Debug, Clone, Default)]
pub struct MemoryTokenJar {
    slot: Arc<Mutex<Option<String>>>,
}

impl MemoryTokenJar {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenJar for MemoryTokenJar {
    fn load(&self) -> Result<Option<String>> {
        Ok(self.slot.lock().unwrap_or_else(|e| e.into_inner()).clone())
    }

    fn store(&self, line: &str) -> Result<()> {
        *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = Some(line.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = None;
        Ok(())
    }
}
