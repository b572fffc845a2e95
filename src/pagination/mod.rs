//! Pagination module
//!
//! Fetch a remote collection page by page, merge pages into one
//! duplicate-free list and expose loading/completion state.
//!
//! # Overview
//!
//! - `PageFetcher` - the injected capability that fetches one page
//! - `FetchCoordinator` - single-flight requests with key-based cancellation
//! - `PageStore` - ordered, gap-free pages for the current key
//! - `merge` / `is_reaching_end` - derived item list and end detection
//! - `CollectionView` - the consumer contract (`load_more`, `reset`, snapshots)

mod coordinator;
mod merge;
mod store;
mod types;
mod view;

pub use coordinator::{FetchCoordinator, FetchOutcome, PendingPage, RequestTag};
pub use merge::{is_reaching_end, merge, merge_with_stats, MergeResult};
pub use store::{AppendOutcome, PageStore};
pub use types::{
    CollectionStats, CountDivergence, DependencyKey, FetchError, FetchErrorKind, FnFetcher,
    LoadOutcome, Page, PageFetcher, PageResult, SkipReason, Status,
};
pub use view::{
    CollectionOptions, CollectionSnapshot, CollectionView, LoadSummary, DEFAULT_PAGE_SIZE,
};
