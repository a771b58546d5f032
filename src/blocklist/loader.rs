//! Blocklist loading from local files.

use std::io::BufReader;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::store::BlocklistStore;
use super::{BlocklistEntry, ParseError, default_entries, parser_for_format};
use crate::config::{BlocklistFormat, BlocklistImport, BlocklistSettings};

/// Error type for blocklist file loading operations.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// File was not found at the specified path.
    #[error("file not found: {0:?}")]
    NotFound(PathBuf),

    /// Permission denied when accessing the file.
    #[error("permission denied: {0:?}")]
    PermissionDenied(PathBuf),

    /// I/O error while reading the file.
    #[error("I/O error reading {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error parsing the blocklist content.
    #[error("parse error")]
    Parse(#[from] ParseError),

    /// Task join error from spawning a blocking task.
    #[error("task join error")]
    Join(#[from] tokio::task::JoinError),
}

/// Loads blocklist files from the filesystem.
pub struct FileLoader;

impl FileLoader {
    /// Read `path` and return the raw domains it lists.
    ///
    /// Parsing runs on the blocking pool so large lists do not stall the
    /// runtime.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::NotFound`] or [`LoadError::PermissionDenied`] for
    /// the matching open failures, [`LoadError::Io`] for other I/O errors.
    pub async fn load(path: &Path, format: BlocklistFormat) -> Result<Vec<String>, LoadError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => LoadError::NotFound(path.to_path_buf()),
                std::io::ErrorKind::PermissionDenied => {
                    LoadError::PermissionDenied(path.to_path_buf())
                }
                _ => LoadError::Io {
                    path: path.to_path_buf(),
                    source: e,
                },
            })?;

        let domains = tokio::task::spawn_blocking(move || {
            parser_for_format(format).parse(&mut BufReader::new(content.as_bytes()))
        })
        .await??;

        Ok(domains)
    }

    /// Load an import as enabled entries under the import's category.
    pub async fn load_import(import: &BlocklistImport) -> Result<Vec<BlocklistEntry>, LoadError> {
        let domains = Self::load(&import.path, import.format).await?;
        let entries = domains
            .iter()
            .map(|domain| BlocklistEntry::new(domain, import.category.as_str()))
            .filter(|entry| !entry.domain.is_empty())
            .collect();
        Ok(entries)
    }
}

/// Gather every configured entry: store (or defaults), inline, then imports.
pub async fn collect_entries(settings: &BlocklistSettings) -> crate::Result<Vec<BlocklistEntry>> {
    let mut entries = match &settings.store_path {
        Some(path) => BlocklistStore::new(path).load().await?,
        None => default_entries(),
    };
    debug!(entries = entries.len(), "base blocklist loaded");

    entries.extend(settings.entries.iter().cloned());

    for import in &settings.imports {
        let imported = FileLoader::load_import(import).await?;
        info!(
            path = ?import.path,
            category = %import.category,
            domains = imported.len(),
            "blocklist import loaded"
        );
        entries.extend(imported);
    }

    Ok(entries)
}
