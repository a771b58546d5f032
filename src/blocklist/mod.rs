//! Blocked-domain entries and where they come from.
//!
//! Entries are gathered once when a filtering session starts and frozen into a
//! [`BlocklistSnapshot`]. Sources are, in order:
//!
//! - **Store**: a JSON file of `{ domain, category, enabled }` entries
//!   ([`store::BlocklistStore`]), falling back to [`default_entries`]
//! - **Inline**: entries listed in the config file
//! - **Imports**: plain domain lists or hosts files ([`loader::FileLoader`])
//!
//! # Example
//!
//! ```
//! use dumbify::blocklist::{BlocklistEntry, BlocklistSnapshot};
//!
//! let entries = [BlocklistEntry::new("Example.COM.", "custom")];
//! let snapshot = BlocklistSnapshot::from_entries(&entries);
//! assert!(snapshot.is_blocked("mail.example.com"));
//! assert!(!snapshot.is_blocked("notexample.com"));
//! ```

mod domains;
mod hosts;
pub mod loader;
pub mod snapshot;
pub mod store;

use std::io::BufRead;

use serde::{Deserialize, Serialize};

pub use domains::DomainListParser;
pub use hosts::HostsFileParser;
pub use snapshot::BlocklistSnapshot;

use crate::config::BlocklistFormat;

/// A domain blocked under a category.
///
/// The domain is normalized on construction and on deserialization, so a
/// loaded entry always holds a lowercase name without a trailing dot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlocklistEntry {
    #[serde(deserialize_with = "deserialize_domain")]
    pub domain: String,
    pub category: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl BlocklistEntry {
    /// Create an enabled entry.
    pub fn new(domain: impl AsRef<str>, category: impl Into<String>) -> Self {
        Self {
            domain: normalize_domain(domain.as_ref()),
            category: category.into(),
            enabled: true,
        }
    }

    /// Return the same entry with `enabled` set.
    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

const fn default_enabled() -> bool {
    true
}

fn deserialize_domain<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    Ok(normalize_domain(&s))
}

/// Normalize a domain for matching: trimmed, lowercase, no trailing dot.
///
/// A leading `*.` wildcard is dropped since every entry already covers its
/// subdomains.
pub fn normalize_domain(domain: &str) -> String {
    let domain = domain.trim();
    let domain = domain.strip_prefix("*.").unwrap_or(domain);
    domain.trim_end_matches('.').to_lowercase()
}

/// Entries used when nothing has been persisted yet.
pub fn default_entries() -> Vec<BlocklistEntry> {
    [
        ("bet365.com", "gambling"),
        ("draftkings.com", "gambling"),
        ("fanduel.com", "gambling"),
        ("pornhub.com", "adult"),
        ("xvideos.com", "adult"),
        ("xnxx.com", "adult"),
        ("casino.com", "gambling"),
        ("pokerstars.com", "gambling"),
    ]
    .into_iter()
    .map(|(domain, category)| BlocklistEntry::new(domain, category))
    .collect()
}

/// Error type for blocklist parsing operations.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// I/O error during reading.
    #[error("I/O error")]
    Io(#[from] std::io::Error),
}

/// Trait for blocklist file parsers.
pub trait BlocklistParser: Send + Sync {
    /// Parse blocklist content and return the raw domains it lists.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] if reading fails.
    fn parse(&self, reader: &mut dyn BufRead) -> Result<Vec<String>, ParseError>;
}

/// Returns a boxed parser for the given blocklist format.
#[must_use]
pub fn parser_for_format(format: BlocklistFormat) -> Box<dyn BlocklistParser> {
    match format {
        BlocklistFormat::Domains => Box::new(DomainListParser),
        BlocklistFormat::Hosts => Box::new(HostsFileParser),
    }
}
