//! Consumer-facing collection contract
//!
//! A [`CollectionView`] owns the state of one paged collection: its key, the
//! resolved pages, the derived item list and the loading flags a UI needs to
//! drive infinite scroll. Handles are cheap to clone; every clone talks to the
//! same state.

use super::coordinator::{FetchCoordinator, FetchOutcome, PendingPage, RequestTag};
use super::merge::{is_reaching_end, merge_with_stats};
use super::store::{AppendOutcome, PageStore};
use super::types::{
    CollectionStats, CountDivergence, DependencyKey, FetchError, LoadOutcome, Page,
    PageFetcher, SkipReason, Status,
};
use crate::error::{Error, Result};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Page size used when none is configured
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Options fixed for the lifetime of a view
#[derive(Debug, Clone)]
pub struct CollectionOptions {
    /// Items requested per page
    pub page_size: u32,
    /// Name used in log lines (e.g. "posts", "followers")
    pub name: String,
}

impl Default for CollectionOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            name: "collection".to_string(),
        }
    }
}

impl CollectionOptions {
    /// Create options with the given page size
    pub fn new(page_size: u32) -> Self {
        Self {
            page_size,
            ..Default::default()
        }
    }

    /// Set the log name
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

/// Read-only view of a collection at one point in time
#[derive(Debug, Clone)]
pub struct CollectionSnapshot<T, K> {
    /// Key the collection is paged for
    pub key: K,
    /// Deduplicated items in page order
    pub items: Arc<[T]>,
    /// Canonical total count (from the first page)
    pub total_count: Option<u64>,
    /// No pages yet and no error
    pub is_initial_loading: bool,
    /// Pages exist and the next one is in flight
    pub is_loading_more: bool,
    /// The last fetch failed
    pub is_error: bool,
    /// Error of the last failed fetch
    pub error: Option<FetchError>,
    /// No further pages are expected
    pub is_reaching_end: bool,
    /// Lifecycle status
    pub status: Status,
    /// Number of resolved pages
    pub page_count: usize,
    /// Set when a later page disagreed with the canonical total count
    pub count_divergence: Option<CountDivergence>,
}

/// How many pages [`CollectionView::load_until_end`] appended and why it stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadSummary {
    /// Pages appended during the walk
    pub pages_appended: usize,
    /// Outcome of the last `load_more` call, if any was made
    pub last_outcome: Option<LoadOutcome>,
}

struct CollectionState<T, K> {
    key: K,
    coordinator: FetchCoordinator<T, K>,
    store: PageStore<T>,
    status: Status,
    error: Option<FetchError>,
    items: Arc<[T]>,
    is_reaching_end: bool,
    count_divergence: Option<CountDivergence>,
    stats: CollectionStats,
}

impl<T, K: Clone> CollectionState<T, K> {
    fn snapshot(&self) -> CollectionSnapshot<T, K> {
        let has_pages = !self.store.is_empty();
        CollectionSnapshot {
            key: self.key.clone(),
            items: Arc::clone(&self.items),
            total_count: self.store.canonical_total(),
            is_initial_loading: !has_pages && self.error.is_none(),
            is_loading_more: has_pages && self.status == Status::LoadingMore,
            is_error: self.error.is_some(),
            error: self.error.clone(),
            is_reaching_end: self.is_reaching_end,
            status: self.status,
            page_count: self.store.len(),
            count_divergence: self.count_divergence,
        }
    }

    fn settled_status(&self) -> Status {
        if self.store.is_empty() {
            Status::Idle
        } else {
            Status::Ready
        }
    }
}

type IdFn<T, Id> = Arc<dyn Fn(&T) -> Id + Send + Sync>;

/// A paged, deduplicated remote collection
///
/// ```rust,ignore
/// let view = CollectionView::new(
///     Arc::new(PostsBySearch::new(client)),
///     |post: &Post| post.id.clone(),
///     CollectionOptions::new(10).with_name("search"),
///     "rust".to_string(),
/// )?;
///
/// view.load_more().await;
/// let snapshot = view.snapshot();
/// ```
pub struct CollectionView<T, K, Id> {
    state: Arc<Mutex<CollectionState<T, K>>>,
    publisher: Arc<watch::Sender<CollectionSnapshot<T, K>>>,
    id_of: IdFn<T, Id>,
    options: Arc<CollectionOptions>,
}

impl<T, K, Id> Clone for CollectionView<T, K, Id> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            publisher: Arc::clone(&self.publisher),
            id_of: Arc::clone(&self.id_of),
            options: Arc::clone(&self.options),
        }
    }
}

impl<T, K, Id> CollectionView<T, K, Id>
where
    T: Clone + Send + Sync + 'static,
    K: DependencyKey,
    Id: Eq + std::hash::Hash + 'static,
{
    /// Create a view for `key`
    ///
    /// Nothing is fetched until the first [`load_more`](Self::load_more).
    pub fn new<F>(
        fetcher: Arc<dyn PageFetcher<T, K>>,
        id_of: F,
        options: CollectionOptions,
        key: K,
    ) -> Result<Self>
    where
        F: Fn(&T) -> Id + Send + Sync + 'static,
    {
        if options.page_size == 0 {
            return Err(Error::invalid_value(
                "page_size",
                "page size must be a positive integer",
            ));
        }

        let mut coordinator = FetchCoordinator::new(fetcher, options.page_size);
        coordinator.activate(key.clone());

        let state = CollectionState {
            key,
            coordinator,
            store: PageStore::new(),
            status: Status::Idle,
            error: None,
            items: Arc::from(Vec::new()),
            is_reaching_end: false,
            count_divergence: None,
            stats: CollectionStats::new(),
        };
        let (publisher, _) = watch::channel(state.snapshot());

        Ok(Self {
            state: Arc::new(Mutex::new(state)),
            publisher: Arc::new(publisher),
            id_of: Arc::new(id_of),
            options: Arc::new(options),
        })
    }

    /// Current state
    pub fn snapshot(&self) -> CollectionSnapshot<T, K> {
        self.lock().snapshot()
    }

    /// Receive a snapshot after every state change
    pub fn subscribe(&self) -> watch::Receiver<CollectionSnapshot<T, K>> {
        self.publisher.subscribe()
    }

    /// Key the collection is currently paged for
    pub fn key(&self) -> K {
        self.lock().key.clone()
    }

    /// Items requested per page
    pub fn page_size(&self) -> u32 {
        self.options.page_size
    }

    /// Lifetime counters
    pub fn stats(&self) -> CollectionStats {
        self.lock().stats
    }

    /// Whether no further pages are expected
    pub fn is_reaching_end(&self) -> bool {
        self.lock().is_reaching_end
    }

    /// Fetch the next page
    ///
    /// Does nothing when the end has been reached or a page is already in
    /// flight. Failures are recorded in state and echoed in the outcome;
    /// calling again retries the same page.
    ///
    /// # Panics
    ///
    /// Must be called from within a Tokio runtime, since the fetch is
    /// applied on a spawned task.
    pub async fn load_more(&self) -> LoadOutcome {
        let pending = match self.begin_load() {
            Ok(pending) => pending,
            Err(reason) => {
                debug!("{}: load_more skipped ({reason:?})", self.options.name);
                return LoadOutcome::Skipped(reason);
            }
        };

        // The fetch is applied from its own task so a dropped caller cannot
        // leave the collection stuck in a loading state.
        let view = self.clone();
        let task = tokio::spawn(async move {
            let (tag, outcome) = pending.resolve().await;
            view.complete(&tag, outcome)
        });

        match task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                let error = FetchError::transient(format!("fetch task failed: {e}"));
                self.abort_load(&error);
                LoadOutcome::Failed(error)
            }
        }
    }

    /// Keep loading until the end, an error, or `max_pages` appended pages
    ///
    /// Needs a Tokio runtime, like [`load_more`](Self::load_more).
    pub async fn load_until_end(&self, max_pages: Option<usize>) -> LoadSummary {
        let mut summary = LoadSummary {
            pages_appended: 0,
            last_outcome: None,
        };

        loop {
            if max_pages.is_some_and(|max| summary.pages_appended >= max) {
                return summary;
            }

            let outcome = self.load_more().await;
            let appended = outcome.is_appended();
            summary.last_outcome = Some(outcome);
            if !appended {
                return summary;
            }
            summary.pages_appended += 1;
        }
    }

    /// Drop all pages and cancel in-flight requests
    ///
    /// Passing a different key is the only way the key changes. Results of
    /// requests issued before the reset are discarded when they arrive.
    pub fn reset(&self, new_key: Option<K>) {
        let mut state = self.lock();

        if let Some(key) = new_key {
            if key != state.key {
                info!(
                    "{}: key changed from {:?} to {key:?}",
                    self.options.name, state.key
                );
                state.key = key;
            }
        }

        state.coordinator.cancel_all();
        let key = state.key.clone();
        state.coordinator.activate(key);

        state.store.reset();
        state.status = Status::Idle;
        state.error = None;
        state.items = Arc::from(Vec::new());
        state.is_reaching_end = false;
        state.count_divergence = None;
        state.stats.duplicates_dropped = 0;

        self.publish(&state);
    }

    fn begin_load(&self) -> std::result::Result<PendingPage<T, K>, SkipReason> {
        let mut state = self.lock();

        if state.is_reaching_end {
            return Err(SkipReason::ReachedEnd);
        }
        if state.status.is_loading() {
            return Err(SkipReason::InFlight);
        }

        let page_index = state.store.next_index_to_fetch();
        state.status = if state.store.is_empty() {
            Status::Loading
        } else {
            Status::LoadingMore
        };
        state.error = None;

        let key = state.key.clone();
        let pending = state.coordinator.request_page(&key, page_index);
        self.publish(&state);

        Ok(pending)
    }

    fn complete(&self, tag: &RequestTag<K>, outcome: FetchOutcome<T>) -> LoadOutcome {
        let mut state = self.lock();
        let page_index = tag.page_index();

        if !state.coordinator.settle(tag) {
            state.stats.add_stale();
            return LoadOutcome::Stale;
        }

        let result = match outcome {
            Ok(result) => result,
            Err(error) => {
                warn!(
                    "{}: page {page_index} for {:?} failed: {error}",
                    self.options.name,
                    tag.key()
                );
                state.status = Status::Error;
                state.error = Some(error.clone());
                state.stats.add_error();
                self.publish(&state);
                return LoadOutcome::Failed(error);
            }
        };

        let result = Arc::try_unwrap(result).unwrap_or_else(|shared| (*shared).clone());
        let page = Page::from_result(page_index, result, self.options.page_size);
        let reported_total = page.total_count();
        let before = state.items.len();

        match state.store.append(page) {
            AppendOutcome::Appended => {}
            AppendOutcome::Duplicate | AppendOutcome::OutOfOrder { .. } => {
                state.stats.add_rejected();
                state.status = state.settled_status();
                self.publish(&state);
                return LoadOutcome::Rejected { page_index };
            }
        }
        state.stats.add_page();

        if let Some(canonical) = state.store.canonical_total() {
            if page_index > 1 && reported_total != canonical {
                warn!(
                    "{}: page {page_index} reported total {reported_total}, keeping {canonical}",
                    self.options.name
                );
                state.count_divergence = Some(CountDivergence {
                    page_index,
                    canonical,
                    observed: reported_total,
                });
            }
        }

        let merged = merge_with_stats(state.store.pages(), |item| (self.id_of)(item));
        state.items = Arc::from(merged.items);
        state.stats.duplicates_dropped = merged.duplicates;
        state.is_reaching_end = is_reaching_end(state.store.pages());
        state.status = Status::Ready;
        state.error = None;

        let new_items = state.items.len().saturating_sub(before);
        debug!(
            "{}: appended page {page_index} ({new_items} new item(s), reaching end: {})",
            self.options.name, state.is_reaching_end
        );
        self.publish(&state);

        LoadOutcome::Appended {
            page_index,
            new_items,
        }
    }

    fn abort_load(&self, error: &FetchError) {
        let mut state = self.lock();
        if state.status.is_loading() {
            state.coordinator.cancel_all();
            let key = state.key.clone();
            state.coordinator.activate(key);
            state.status = Status::Error;
            state.error = Some(error.clone());
            state.stats.add_error();
            self.publish(&state);
        }
    }

    fn publish(&self, state: &CollectionState<T, K>) {
        self.publisher.send_replace(state.snapshot());
    }

    fn lock(&self) -> MutexGuard<'_, CollectionState<T, K>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T, K: fmt::Debug, Id> fmt::Debug for CollectionView<T, K, Id> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionView")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
