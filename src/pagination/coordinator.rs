//! Single-flight fetch coordination
//!
//! Every request is tagged with the key, page index and generation it was
//! issued under. Cancelling bumps the generation, so a late result can be
//! recognised and dropped when it finally resolves.

use super::types::{DependencyKey, FetchError, PageFetcher, PageResult};
use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Resolved value of a page request, shared by every caller that joined it
pub type FetchOutcome<T> = std::result::Result<Arc<PageResult<T>>, FetchError>;

type SharedFetch<T> = Shared<BoxFuture<'static, FetchOutcome<T>>>;

/// Identity of an issued page request
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestTag<K> {
    key: K,
    page_index: u32,
    generation: u64,
}

impl<K> RequestTag<K> {
    /// Key the request was issued for
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Page index the request was issued for
    pub fn page_index(&self) -> u32 {
        self.page_index
    }

    /// Generation the request was issued under
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// A page request that may still be in flight
pub struct PendingPage<T, K> {
    tag: RequestTag<K>,
    future: SharedFetch<T>,
    joined: bool,
}

impl<T, K> PendingPage<T, K>
where
    T: Send + Sync + 'static,
    K: DependencyKey,
{
    /// Tag identifying the request
    pub fn tag(&self) -> &RequestTag<K> {
        &self.tag
    }

    /// Whether this handle joined a request that was already in flight
    pub fn was_joined(&self) -> bool {
        self.joined
    }

    /// Wait for the request to resolve
    pub async fn resolve(self) -> (RequestTag<K>, FetchOutcome<T>) {
        let Self { tag, future, .. } = self;
        (tag, future.await)
    }
}

impl<T, K: fmt::Debug> fmt::Debug for PendingPage<T, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingPage")
            .field("tag", &self.tag)
            .field("joined", &self.joined)
            .finish_non_exhaustive()
    }
}

struct InFlight<T, K> {
    tag: RequestTag<K>,
    future: SharedFetch<T>,
}

/// Issues page requests with at most one in flight per (key, index)
pub struct FetchCoordinator<T, K> {
    fetcher: Arc<dyn PageFetcher<T, K>>,
    page_size: u32,
    active_key: Option<K>,
    generation: u64,
    in_flight: HashMap<u32, InFlight<T, K>>,
}

impl<T, K> FetchCoordinator<T, K>
where
    T: Send + Sync + 'static,
    K: DependencyKey,
{
    /// Create a coordinator requesting pages of `page_size` items
    pub fn new(fetcher: Arc<dyn PageFetcher<T, K>>, page_size: u32) -> Self {
        Self {
            fetcher,
            page_size,
            active_key: None,
            generation: 0,
            in_flight: HashMap::new(),
        }
    }

    /// Page size every request is issued with
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Key requests are currently accepted for
    pub fn active_key(&self) -> Option<&K> {
        self.active_key.as_ref()
    }

    /// Current cancellation generation
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Request a page, joining an identical in-flight request if there is one
    ///
    /// Requesting a key other than the active one activates it first, which
    /// cancels everything issued for the previous key.
    pub fn request_page(&mut self, key: &K, page_index: u32) -> PendingPage<T, K> {
        if self.active_key.as_ref() != Some(key) {
            self.activate(key.clone());
        }

        if let Some(existing) = self.in_flight.get(&page_index) {
            debug!("Joining in-flight request for {key:?} page {page_index}");
            return PendingPage {
                tag: existing.tag.clone(),
                future: existing.future.clone(),
                joined: true,
            };
        }

        let tag = RequestTag {
            key: key.clone(),
            page_index,
            generation: self.generation,
        };

        let fetcher = Arc::clone(&self.fetcher);
        let request_key = key.clone();
        let page_size = self.page_size;
        let future = async move {
            fetcher
                .as_ref()
                .fetch_page(page_index, page_size, &request_key)
                .await
                .map(Arc::new)
                .map_err(|e| FetchError::classify(&e))
        }
        .boxed()
        .shared();

        debug!(
            "Requesting {key:?} page {page_index} (size {page_size}, generation {})",
            self.generation
        );
        self.in_flight.insert(
            page_index,
            InFlight {
                tag: tag.clone(),
                future: future.clone(),
            },
        );

        PendingPage {
            tag,
            future,
            joined: false,
        }
    }

    /// Make `key` the active key, cancelling requests for any other key
    pub fn activate(&mut self, key: K) {
        if self.active_key.as_ref() == Some(&key) {
            return;
        }
        self.cancel_all();
        debug!("Activating key {key:?}");
        self.active_key = Some(key);
    }

    /// Invalidate every outstanding request
    ///
    /// Their results are still delivered to whoever awaits them, but
    /// [`settle`](Self::settle) will report them as stale.
    pub fn cancel_all(&mut self) {
        if !self.in_flight.is_empty() {
            debug!(
                "Cancelling {} in-flight request(s) of generation {}",
                self.in_flight.len(),
                self.generation
            );
        }
        self.in_flight.clear();
        self.generation = self.generation.wrapping_add(1);
    }

    /// Check a resolved request against the current key and generation
    ///
    /// Returns `true` when the result may be handed to the page store.
    pub fn settle(&mut self, tag: &RequestTag<K>) -> bool {
        let current =
            tag.generation == self.generation && self.active_key.as_ref() == Some(&tag.key);
        if current {
            self.in_flight.remove(&tag.page_index);
        } else {
            debug!(
                "Ignoring stale result for {:?} page {} (generation {} != {})",
                tag.key, tag.page_index, tag.generation, self.generation
            );
        }
        current
    }

    /// Whether a request for (key, index) is in flight
    pub fn is_in_flight(&self, key: &K, page_index: u32) -> bool {
        self.active_key.as_ref() == Some(key) && self.in_flight.contains_key(&page_index)
    }

    /// Number of requests in flight for the active key
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }
}

impl<T, K: fmt::Debug> fmt::Debug for FetchCoordinator<T, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchCoordinator")
            .field("page_size", &self.page_size)
            .field("active_key", &self.active_key)
            .field("generation", &self.generation)
            .field("in_flight", &self.in_flight.len())
            .finish_non_exhaustive()
    }
}
