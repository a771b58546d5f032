//! Persisted blocklist entries.
//!
//! The store is a JSON array of [`BlocklistEntry`] values. It is read once at
//! session start; edits made through the store only reach the filter after
//! the session is restarted.

use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::{BlocklistEntry, default_entries, normalize_domain};

/// Error type for blocklist store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// I/O error while reading or writing the store file.
    #[error("I/O error on {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The store file does not hold a valid entry list.
    #[error("invalid blocklist store {path:?}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// JSON file holding the user's blocked domains.
#[derive(Debug, Clone)]
pub struct BlocklistStore {
    path: PathBuf,
}

impl BlocklistStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored entries, or the built-in defaults when the file does
    /// not exist yet.
    pub async fn load(&self) -> Result<Vec<BlocklistEntry>, StoreError> {
        let content = match tokio::fs::read(&self.path).await {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                info!(path = ?self.path, "blocklist store missing, using defaults");
                return Ok(default_entries());
            }
            Err(source) => return Err(self.io_error(source)),
        };

        let entries: Vec<BlocklistEntry> =
            serde_json::from_slice(&content).map_err(|source| StoreError::Json {
                path: self.path.clone(),
                source,
            })?;
        debug!(path = ?self.path, entries = entries.len(), "blocklist store loaded");
        Ok(entries)
    }

    /// Replace the stored entries.
    pub async fn save(&self, entries: &[BlocklistEntry]) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(entries).map_err(|source| StoreError::Json {
            path: self.path.clone(),
            source,
        })?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| self.io_error(source))?;
        }
        tokio::fs::write(&self.path, json)
            .await
            .map_err(|source| self.io_error(source))
    }

    /// Add an entry, replacing any stored entry for the same domain.
    pub async fn add(&self, entry: BlocklistEntry) -> Result<(), StoreError> {
        let mut entries = self.load().await?;
        match entries.iter_mut().find(|e| e.domain == entry.domain) {
            Some(existing) => *existing = entry,
            None => entries.push(entry),
        }
        self.save(&entries).await
    }

    /// Remove the entry for `domain`. Returns whether one was removed.
    pub async fn remove(&self, domain: &str) -> Result<bool, StoreError> {
        let domain = normalize_domain(domain);
        let mut entries = self.load().await?;
        let before = entries.len();
        entries.retain(|e| e.domain != domain);
        if entries.len() == before {
            return Ok(false);
        }
        self.save(&entries).await?;
        Ok(true)
    }

    /// Enable or disable the entry for `domain`. Returns whether it exists.
    pub async fn set_enabled(&self, domain: &str, enabled: bool) -> Result<bool, StoreError> {
        let domain = normalize_domain(domain);
        let mut entries = self.load().await?;
        let Some(entry) = entries.iter_mut().find(|e| e.domain == domain) else {
            return Ok(false);
        };
        entry.enabled = enabled;
        self.save(&entries).await?;
        Ok(true)
    }

    fn io_error(&self, source: io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}
