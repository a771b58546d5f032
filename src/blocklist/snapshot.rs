//! Immutable blocklist used by a running packet pump.
//!
//! A snapshot is taken once when a session starts. Changing the configured
//! entries afterwards has no effect until the session is restarted.

use std::collections::HashSet;
use std::sync::Arc;

use super::{BlocklistEntry, normalize_domain};

/// Set of blocked domains captured from the enabled entries.
///
/// Cloning is cheap: clones share the same read-only set.
#[derive(Debug, Clone, Default)]
pub struct BlocklistSnapshot {
    domains: Arc<HashSet<String>>,
}

impl BlocklistSnapshot {
    /// Capture the enabled entries. Disabled entries are left out entirely.
    pub fn from_entries<'a, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = &'a BlocklistEntry>,
    {
        let domains = entries
            .into_iter()
            .filter(|entry| entry.enabled)
            .map(|entry| normalize_domain(&entry.domain))
            .filter(|domain| !domain.is_empty())
            .collect();

        Self {
            domains: Arc::new(domains),
        }
    }

    /// Check whether `domain` is blocked.
    ///
    /// A domain is blocked when it equals an entry or ends with `"." + entry`,
    /// so `example.com` covers `mail.example.com` but not `notexample.com`.
    /// Each label-boundary suffix is looked up in the set instead of scanning
    /// every entry.
    pub fn is_blocked(&self, domain: &str) -> bool {
        if self.domains.is_empty() {
            return false;
        }

        let domain = domain.trim_end_matches('.').to_ascii_lowercase();
        let mut candidate = domain.as_str();
        loop {
            if self.domains.contains(candidate) {
                return true;
            }
            match candidate.split_once('.') {
                Some((_, parent)) => candidate = parent,
                None => return false,
            }
        }
    }

    /// Number of distinct blocked domains.
    pub fn len(&self) -> usize {
        self.domains.len()
    }

    /// Whether nothing is blocked.
    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(domains: &[&str]) -> BlocklistSnapshot {
        let entries: Vec<_> = domains
            .iter()
            .map(|domain| BlocklistEntry::new(domain, "test"))
            .collect();
        BlocklistSnapshot::from_entries(&entries)
    }

    #[test]
    fn should_block_exact_and_subdomain_matches() {
        let snapshot = snapshot(&["example.com"]);

        assert!(snapshot.is_blocked("example.com"));
        assert!(snapshot.is_blocked("mail.example.com"));
        assert!(snapshot.is_blocked("a.b.c.example.com"));
    }

    #[test]
    fn should_only_match_at_label_boundaries() {
        let snapshot = snapshot(&["example.com"]);

        assert!(!snapshot.is_blocked("notexample.com"));
        assert!(!snapshot.is_blocked("example.com.evil.org"));
        assert!(!snapshot.is_blocked("com"));
    }

    #[test]
    fn should_match_case_insensitively() {
        let snapshot = snapshot(&["Example.com"]);

        assert!(snapshot.is_blocked("Example.COM"));
        assert!(snapshot.is_blocked("MAIL.example.com"));
    }

    #[test]
    fn should_ignore_trailing_dot_in_query() {
        let snapshot = snapshot(&["example.com"]);
        assert!(snapshot.is_blocked("example.com."));
    }

    #[test]
    fn should_exclude_disabled_entries() {
        let entries = [
            BlocklistEntry::new("pornhub.com", "adult").with_enabled(false),
            BlocklistEntry::new("casino.com", "gambling"),
        ];
        let snapshot = BlocklistSnapshot::from_entries(&entries);

        assert_eq!(snapshot.len(), 1);
        assert!(!snapshot.is_blocked("pornhub.com"));
        assert!(snapshot.is_blocked("casino.com"));
    }

    #[test]
    fn should_deduplicate_entries() {
        let snapshot = snapshot(&["casino.com", "CASINO.com", "casino.com."]);
        assert_eq!(snapshot.len(), 1);
    }

    #[test]
    fn should_not_block_when_empty() {
        let snapshot = BlocklistSnapshot::default();

        assert!(snapshot.is_empty());
        assert!(!snapshot.is_blocked("example.com"));
        assert!(!snapshot.is_blocked(""));
    }

    #[test]
    fn should_share_domains_between_clones() {
        let first = snapshot(&["example.com"]);
        let second = first.clone();

        assert!(Arc::ptr_eq(&first.domains, &second.domains));
        assert!(second.is_blocked("www.example.com"));
    }
}
