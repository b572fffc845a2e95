//! Derived collection state
//!
//! Both functions are pure and recomputed from the full page list whenever it
//! changes. Nothing here is patched incrementally.

use super::types::Page;
use std::collections::HashSet;
use std::hash::Hash;

// ============================================================================
// Merger
// ============================================================================

/// Output of [`merge_with_stats`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeResult<T> {
    /// Deduplicated items in page order
    pub items: Vec<T>,
    /// Items dropped because their id was already seen
    pub duplicates: usize,
}

/// Flatten pages into a duplicate-free list
///
/// Pages are walked in index order and items in server order; the first
/// occurrence of an id wins.
pub fn merge<T, Id, F>(pages: &[Page<T>], id_of: F) -> Vec<T>
where
    T: Clone,
    Id: Eq + Hash,
    F: Fn(&T) -> Id,
{
    merge_with_stats(pages, id_of).items
}

/// Same as [`merge`], also counting dropped duplicates
pub fn merge_with_stats<T, Id, F>(pages: &[Page<T>], id_of: F) -> MergeResult<T>
where
    T: Clone,
    Id: Eq + Hash,
    F: Fn(&T) -> Id,
{
    let capacity = pages.iter().map(Page::len).sum();
    let mut seen = HashSet::with_capacity(capacity);
    let mut items = Vec::with_capacity(capacity);
    let mut duplicates = 0;

    for page in pages {
        for item in page.items() {
            if seen.insert(id_of(item)) {
                items.push(item.clone());
            } else {
                duplicates += 1;
            }
        }
    }

    MergeResult { items, duplicates }
}

// ============================================================================
// End Detection
// ============================================================================

/// Whether no further pages are expected
///
/// True when the first page came back empty or the last page is shorter than
/// the page size it was served with. Reported total counts are deliberately
/// ignored: several backends return approximate or stale counts.
pub fn is_reaching_end<T>(pages: &[Page<T>]) -> bool {
    let (Some(first), Some(last)) = (pages.first(), pages.last()) else {
        return false;
    };
    first.is_empty() || last.is_short()
}
