//! File-based cache persistence
//!
//! Lets the operator binary keep sessions between runs by writing the
//! memory backend's snapshot to the platform cache directory.

use super::backend::PersistedEntry;
use crate::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

const CACHE_DIR_NAME: &str = "bookie-session";
const CACHE_FILE_NAME: &str = "cache.json";

/// Default snapshot location under the user cache directory
pub fn get_cache_path() -> Result<PathBuf> {
    let base = dirs::cache_dir()
        .ok_or_else(|| Error::config("Could not determine the user cache directory"))?;
    Ok(base.join(CACHE_DIR_NAME).join(CACHE_FILE_NAME))
}

/// JSON snapshot file
#[derive(Debug, Clone)]
pub struct FileCache {
    path: PathBuf,
}

impl FileCache {
    /// Create a file cache at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Snapshot file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the snapshot; a missing file is an empty snapshot
    pub async fn load_cache(&self) -> Result<Vec<PersistedEntry>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No cache file at {:?}", self.path);
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let entries: Vec<PersistedEntry> = serde_json::from_str(&content)?;
        debug!("Loaded {} cache entries from {:?}", entries.len(), self.path);
        Ok(entries)
    }

    /// Write the snapshot, creating parent directories as needed
    pub async fn save_cache(&self, entries: &[PersistedEntry]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(entries)?;
        tokio::fs::write(&self.path, content).await?;
        debug!("Saved {} cache entries to {:?}", entries.len(), self.path);
        Ok(())
    }
}
