//! Collection definition types
//!
//! A collection definition describes one remote paged collection: where it
//! lives, how a page is requested and how the response is shaped.

use crate::decode::{JsonPageDecoder, ResponseShape};
use crate::error::Result;
use crate::http::{
    HttpClient, HttpClientConfig, HttpPageFetcher, PageRequest, RateLimiterConfig,
    DEFAULT_PAGE_PARAM, DEFAULT_PAGE_SIZE_PARAM,
};
use crate::pagination::{
    CollectionOptions, CollectionView, DependencyKey, PageFetcher, DEFAULT_PAGE_SIZE,
};
use crate::types::{BackoffType, Method, OptionStringExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Collection Definition
// ============================================================================

/// Complete collection definition loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionDefinition {
    /// Collection name (e.g., "posts", "followers")
    pub name: String,

    /// Description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Base URL for API requests
    pub base_url: String,

    /// Items requested per page
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// How to request a page
    pub request: RequestDefinition,

    /// Where the page fields live in the response
    #[serde(default)]
    pub response: ResponseShape,

    /// HTTP client settings
    #[serde(default)]
    pub http: HttpDefinition,

    /// Values exposed to templates under `vars`
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub vars: Value,
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

impl CollectionDefinition {
    /// View options for this collection
    pub fn collection_options(&self) -> CollectionOptions {
        CollectionOptions::new(self.page_size).with_name(&self.name)
    }

    /// Request template for this collection
    pub fn page_request(&self) -> PageRequest {
        let mut request = PageRequest::new(&self.request.path)
            .with_method(self.request.method)
            .with_page_params(
                self.request.page_param.clone(),
                self.request.page_size_param.clone(),
            )
            .with_vars(self.vars.clone());

        for (key, value) in &self.request.query {
            request = request.with_query(key, value);
        }
        for (key, value) in &self.request.headers {
            request = request.with_header(key, value);
        }
        if let Some(ref body) = self.request.body {
            request = request.with_body(body.clone());
        }
        request
    }

    /// Decoder for this collection's responses
    pub fn decoder(&self) -> JsonPageDecoder {
        JsonPageDecoder::new(self.response.clone())
    }

    /// HTTP client config for this collection
    pub fn http_config(&self) -> HttpClientConfig {
        self.http.to_client_config(&self.base_url)
    }

    /// Build the page fetcher for this collection
    pub fn build_fetcher(&self) -> Result<HttpPageFetcher> {
        let client = HttpClient::with_config(self.http_config())?;
        Ok(HttpPageFetcher::with_decoder(
            Arc::new(client),
            self.page_request(),
            Arc::new(self.decoder()),
        ))
    }

    /// Build a view over this collection for `key`
    ///
    /// Items are identified by the response shape's id path.
    pub fn build_view<K>(&self, key: K) -> Result<CollectionView<Value, K, String>>
    where
        K: DependencyKey + Serialize,
    {
        let fetcher = self.build_fetcher()?;
        let decoder = fetcher.decoder();
        let fetcher: Arc<dyn PageFetcher<Value, K>> = Arc::new(fetcher);
        CollectionView::new(
            fetcher,
            move |item: &Value| decoder.item_id(item),
            self.collection_options(),
            key,
        )
    }
}

// ============================================================================
// Request Definition
// ============================================================================

/// How to request one page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestDefinition {
    /// Path template (e.g., "/categories/{{ key }}/posts")
    pub path: String,

    /// HTTP method
    #[serde(default)]
    pub method: Method,

    /// Query parameter carrying the page index; null disables it
    #[serde(default = "default_page_param")]
    pub page_param: Option<String>,

    /// Query parameter carrying the page size; null disables it
    #[serde(default = "default_page_size_param")]
    pub page_size_param: Option<String>,

    /// Extra query parameters (values may be templates)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub query: BTreeMap<String, String>,

    /// Extra headers (values may be templates)
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,

    /// JSON body for POST requests
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

fn default_page_param() -> Option<String> {
    Some(DEFAULT_PAGE_PARAM.to_string())
}

fn default_page_size_param() -> Option<String> {
    Some(DEFAULT_PAGE_SIZE_PARAM.to_string())
}

// ============================================================================
// HTTP Definition
// ============================================================================

/// HTTP client settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpDefinition {
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Maximum retries
    #[serde(default = "default_retries")]
    pub max_retries: u32,
    /// Backoff between retries
    #[serde(default)]
    pub backoff: BackoffType,
    /// First backoff delay in milliseconds
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,
    /// Backoff ceiling in seconds
    #[serde(default = "default_max_backoff")]
    pub max_backoff_secs: u64,
    /// Rate limit (requests per second); unset disables limiting
    #[serde(default)]
    pub requests_per_second: Option<u32>,
    /// Rate limiter burst, defaults to the rate
    #[serde(default)]
    pub burst: Option<u32>,
    /// User agent
    #[serde(default)]
    pub user_agent: Option<String>,
    /// Headers sent with every request
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,
}

impl Default for HttpDefinition {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            max_retries: default_retries(),
            backoff: BackoffType::default(),
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_secs: default_max_backoff(),
            requests_per_second: None,
            burst: None,
            user_agent: None,
            headers: HashMap::new(),
        }
    }
}

impl HttpDefinition {
    /// Convert to a client config rooted at `base_url`
    pub fn to_client_config(&self, base_url: &str) -> HttpClientConfig {
        let mut builder = HttpClientConfig::builder()
            .base_url(base_url)
            .timeout(Duration::from_secs(self.timeout_secs))
            .max_retries(self.max_retries)
            .backoff(
                self.backoff,
                Duration::from_millis(self.initial_backoff_ms),
                Duration::from_secs(self.max_backoff_secs),
            );

        builder = match self.requests_per_second {
            Some(rps) => builder.rate_limit(RateLimiterConfig::new(rps, self.burst.unwrap_or(rps))),
            None => builder.no_rate_limit(),
        };
        if let Some(agent) = self.user_agent.clone().none_if_empty() {
            builder = builder.user_agent(agent);
        }
        for (key, value) in &self.headers {
            builder = builder.header(key, value);
        }
        builder.build()
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_retries() -> u32 {
    3
}

fn default_initial_backoff() -> u64 {
    100
}

fn default_max_backoff() -> u64 {
    60
}
