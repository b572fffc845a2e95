//! Pagination types and traits
//!
//! Defines the page model, the fetch capability every collection is built on,
//! and the state/outcome types shared by the coordinator and the view.

use crate::error::{Error, Result};
use async_trait::async_trait;
use std::fmt::{self, Debug};
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;

// ============================================================================
// Dependency Key
// ============================================================================

/// Identifies which logical collection is being paged
///
/// A search query, a category name, a user id. Any value with structural
/// equality qualifies.
pub trait DependencyKey: Clone + Eq + Hash + Debug + Send + Sync + 'static {}

impl<K> DependencyKey for K where K: Clone + Eq + Hash + Debug + Send + Sync + 'static {}

// ============================================================================
// Page Payloads
// ============================================================================

/// Payload returned by a [`PageFetcher`] for one page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageResult<T> {
    /// Items in server order
    pub items: Vec<T>,
    /// Total number of items the backend reports for the collection
    pub total_count: u64,
    /// Page size reported by the backend, if any
    pub page_size: Option<u32>,
}

impl<T> PageResult<T> {
    /// Create a page result
    pub fn new(items: Vec<T>, total_count: u64) -> Self {
        Self {
            items,
            total_count,
            page_size: None,
        }
    }

    /// Create an empty page result
    pub fn empty(total_count: u64) -> Self {
        Self::new(Vec::new(), total_count)
    }

    /// Set the page size reported by the backend
    #[must_use]
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = Some(page_size);
        self
    }
}

/// One resolved page for a (key, index) pair
///
/// Created once per successful fetch and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    index: u32,
    items: Vec<T>,
    total_count: u64,
    page_size: u32,
}

impl<T> Page<T> {
    /// Create a page
    pub fn new(index: u32, items: Vec<T>, total_count: u64, page_size: u32) -> Self {
        Self {
            index,
            items,
            total_count,
            page_size,
        }
    }

    /// Build a page from a fetch result
    ///
    /// The reported page size wins; otherwise the size the fetch was
    /// requested with is recorded.
    pub fn from_result(index: u32, result: PageResult<T>, requested_page_size: u32) -> Self {
        Self {
            index,
            page_size: result.page_size.unwrap_or(requested_page_size),
            items: result.items,
            total_count: result.total_count,
        }
    }

    /// 1-based page index
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Items in server order
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Total count reported with this page
    pub fn total_count(&self) -> u64 {
        self.total_count
    }

    /// Page size this page was served with
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Number of items on this page
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the page holds no items
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether the page holds fewer items than its page size
    pub fn is_short(&self) -> bool {
        self.items.len() < self.page_size as usize
    }
}

// ============================================================================
// Fetch Capability
// ============================================================================

/// The capability a collection pages through
///
/// Implemented per feature (posts, categories, search, followers) on top of
/// whatever transport the feature uses. Must be safe to call once per
/// (key, index): the engine treats it as idempotent and side-effect free.
#[async_trait]
pub trait PageFetcher<T, K>: Send + Sync {
    /// Fetch one page of the collection identified by `key`
    async fn fetch_page(&self, page_index: u32, page_size: u32, key: &K) -> Result<PageResult<T>>;
}

/// Adapts an async closure into a [`PageFetcher`]
///
/// ```rust,ignore
/// let fetcher = FnFetcher::new(|page, size, query: String| async move {
///     search_client.search(&query, page, size).await
/// });
/// ```
#[derive(Clone)]
pub struct FnFetcher<F> {
    fetch: F,
}

impl<F> FnFetcher<F> {
    /// Wrap a closure `(page_index, page_size, key) -> Future<Result<PageResult<T>>>`
    pub fn new(fetch: F) -> Self {
        Self { fetch }
    }
}

impl<F> Debug for FnFetcher<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnFetcher").finish_non_exhaustive()
    }
}

#[async_trait]
impl<T, K, F, Fut> PageFetcher<T, K> for FnFetcher<F>
where
    T: Send + 'static,
    K: DependencyKey,
    F: Fn(u32, u32, K) -> Fut + Send + Sync,
    Fut: Future<Output = Result<PageResult<T>>> + Send + 'static,
{
    async fn fetch_page(&self, page_index: u32, page_size: u32, key: &K) -> Result<PageResult<T>> {
        (self.fetch)(page_index, page_size, key.clone()).await
    }
}

#[async_trait]
impl<T, K, F> PageFetcher<T, K> for Arc<F>
where
    T: Send + 'static,
    K: DependencyKey,
    F: PageFetcher<T, K> + ?Sized,
{
    async fn fetch_page(&self, page_index: u32, page_size: u32, key: &K) -> Result<PageResult<T>> {
        (**self).fetch_page(page_index, page_size, key).await
    }
}

// ============================================================================
// Fetch Errors
// ============================================================================

/// Classification of a failed page fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    /// The fetcher resolved with a malformed payload
    Protocol,
    /// Network, timeout, or server failure in the fetcher
    Transient,
}

impl fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Protocol => f.write_str("protocol"),
            Self::Transient => f.write_str("transient"),
        }
    }
}

/// A classified fetch failure, recorded in collection state
///
/// The engine treats both kinds identically: the failed page is never
/// appended and earlier pages survive.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} fetch error: {message}")]
pub struct FetchError {
    kind: FetchErrorKind,
    message: String,
    retryable: bool,
}

impl FetchError {
    /// Classify a crate error
    pub fn classify(error: &Error) -> Self {
        let kind = if error.is_protocol() {
            FetchErrorKind::Protocol
        } else {
            FetchErrorKind::Transient
        };
        Self {
            kind,
            message: error.to_string(),
            retryable: error.is_retryable(),
        }
    }

    /// Create a protocol error
    pub fn protocol(message: impl Into<String>) -> Self {
        Self {
            kind: FetchErrorKind::Protocol,
            message: message.into(),
            retryable: false,
        }
    }

    /// Create a transient error
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            kind: FetchErrorKind::Transient,
            message: message.into(),
            retryable: true,
        }
    }

    /// Error classification
    pub fn kind(&self) -> FetchErrorKind {
        self.kind
    }

    /// Human-readable message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Whether the payload was malformed
    pub fn is_protocol(&self) -> bool {
        self.kind == FetchErrorKind::Protocol
    }

    /// Advisory hint: whether the underlying cause looked retryable
    pub fn is_retryable(&self) -> bool {
        self.retryable
    }
}

impl From<Error> for FetchError {
    fn from(error: Error) -> Self {
        Self::classify(&error)
    }
}

// ============================================================================
// Collection State
// ============================================================================

/// Lifecycle status of a collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Status {
    /// Nothing requested since creation or the last reset
    #[default]
    Idle,
    /// First page in flight
    Loading,
    /// A follow-up page in flight
    LoadingMore,
    /// Last fetch failed
    Error,
    /// Pages resolved, nothing in flight
    Ready,
}

impl Status {
    /// Whether a fetch is in flight
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading | Self::LoadingMore)
    }
}

/// A later page reported a total count different from the first page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountDivergence {
    /// Page that reported the diverging count
    pub page_index: u32,
    /// Count recorded by the first page (kept)
    pub canonical: u64,
    /// Count the later page reported (ignored)
    pub observed: u64,
}

/// Why `load_more` did nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The collection has reached its end
    ReachedEnd,
    /// A page is already being fetched
    InFlight,
}

/// Result of a single `load_more` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// A page was appended
    Appended {
        /// Index of the appended page
        page_index: u32,
        /// Items that survived deduplication
        new_items: usize,
    },
    /// No request was issued
    Skipped(SkipReason),
    /// The fetch failed; the error is also recorded in state
    Failed(FetchError),
    /// The result belonged to an invalidated key or generation and was dropped
    Stale,
    /// The page store refused the page
    Rejected {
        /// Index of the refused page
        page_index: u32,
    },
}

impl LoadOutcome {
    /// Check if a page was appended
    pub fn is_appended(&self) -> bool {
        matches!(self, Self::Appended { .. })
    }

    /// Check if the call was a no-op
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped(_))
    }

    /// Check if the fetch failed
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Counters kept for the lifetime of a collection view
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectionStats {
    /// Pages appended
    pub pages_fetched: usize,
    /// Fetch attempts that failed
    pub fetch_errors: usize,
    /// Results dropped because their key was invalidated
    pub stale_results: usize,
    /// Pages the store refused
    pub rejected_pages: usize,
    /// Items dropped as duplicates in the current merge
    pub duplicates_dropped: usize,
}

impl CollectionStats {
    /// Create new stats
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an appended page
    pub fn add_page(&mut self) {
        self.pages_fetched += 1;
    }

    /// Record a failed fetch
    pub fn add_error(&mut self) {
        self.fetch_errors += 1;
    }

    /// Record a dropped stale result
    pub fn add_stale(&mut self) {
        self.stale_results += 1;
    }

    /// Record a refused page
    pub fn add_rejected(&mut self) {
        self.rejected_pages += 1;
    }
}
