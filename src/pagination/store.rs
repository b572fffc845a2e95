//! Ordered page storage for the current dependency key

use super::types::Page;
use tracing::warn;

/// Result of appending a page to a [`PageStore`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// The page became the new last page
    Appended,
    /// A page with this index is already stored
    Duplicate,
    /// The index is not `last_index + 1`
    OutOfOrder {
        /// The only index the store would accept
        expected: u32,
    },
}

impl AppendOutcome {
    /// Check if the page was stored
    pub fn is_appended(&self) -> bool {
        matches!(self, Self::Appended)
    }
}

/// Append-only, gap-free record of resolved pages
///
/// Pages are contiguous from index 1. Anything that would break that is
/// refused rather than buffered.
#[derive(Debug, Clone)]
pub struct PageStore<T> {
    pages: Vec<Page<T>>,
}

impl<T> Default for PageStore<T> {
    fn default() -> Self {
        Self { pages: Vec::new() }
    }
}

impl<T> PageStore<T> {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the next page
    pub fn append(&mut self, page: Page<T>) -> AppendOutcome {
        let expected = self.next_index_to_fetch();
        let index = page.index();

        if index >= 1 && index < expected {
            warn!("Ignoring page {index}: already stored");
            return AppendOutcome::Duplicate;
        }
        if index != expected {
            warn!("Ignoring page {index}: expected page {expected}");
            return AppendOutcome::OutOfOrder { expected };
        }

        self.pages.push(page);
        AppendOutcome::Appended
    }

    /// Drop every page
    pub fn reset(&mut self) {
        self.pages.clear();
    }

    /// Index the next fetch should request (`last + 1`, or 1 when empty)
    pub fn next_index_to_fetch(&self) -> u32 {
        self.last().map_or(1, |page| page.index() + 1)
    }

    /// Pages in index order
    pub fn pages(&self) -> &[Page<T>] {
        &self.pages
    }

    /// The most recently appended page
    pub fn last(&self) -> Option<&Page<T>> {
        self.pages.last()
    }

    /// Total count reported by the first page
    pub fn canonical_total(&self) -> Option<u64> {
        self.pages.first().map(Page::total_count)
    }

    /// Whether a page with this index is stored
    pub fn contains(&self, index: u32) -> bool {
        index >= 1 && (index as usize) <= self.pages.len()
    }

    /// Number of stored pages
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// Whether no page is stored
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}
