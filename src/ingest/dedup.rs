//! Link-based deduplication for one ingestion run.

use std::collections::HashSet;

/// Links known for a feed during one run.
///
/// Seeded with the stored links, then extended with every link queued in the
/// current batch, so a document listing the same link twice yields one item.
#[derive(Debug, Default)]
pub struct DedupIndex {
    links: HashSet<String>,
}

impl DedupIndex {
    /// Build an index from already stored links.
    pub fn new(stored: HashSet<String>) -> Self {
        Self { links: stored }
    }

    /// Record a link. Returns `false` if it was already known.
    pub fn admit(&mut self, link: &str) -> bool {
        if self.links.contains(link) {
            return false;
        }
        self.links.insert(link.to_string())
    }

    /// Whether the link is already known.
    pub fn contains(&self, link: &str) -> bool {
        self.links.contains(link)
    }

    /// Number of known links.
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// Whether no links are known.
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admit_new_and_stored() {
        let stored = HashSet::from(["https://example.com/a".to_string()]);
        let mut index = DedupIndex::new(stored);

        assert!(!index.admit("https://example.com/a"));
        assert!(index.admit("https://example.com/b"));
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_admit_repeated_within_batch() {
        let mut index = DedupIndex::default();
        assert!(index.is_empty());

        assert!(index.admit("https://example.com/a"));
        assert!(!index.admit("https://example.com/a"));
        assert!(index.contains("https://example.com/a"));
    }

    #[test]
    fn test_links_compare_exactly() {
        let mut index = DedupIndex::default();
        assert!(index.admit("https://example.com/a"));
        assert!(index.admit("https://example.com/a/"));
        assert!(index.admit("HTTPS://example.com/a"));
    }
}
