//! REST page fetcher
//!
//! Implements [`PageFetcher`] over HTTP: the request path and query values
//! are templates rendered per page, and the JSON body is decoded into the
//! engine's page payload by a [`PageDecoder`].

use super::client::{HttpClient, RequestConfig};
use crate::decode::{JsonPageDecoder, PageDecoder};
use crate::error::{Error, Result};
use crate::pagination::{DependencyKey, PageFetcher, PageResult};
use crate::template::{render, render_path, TemplateContext};
use crate::types::Method;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Default query parameter carrying the 1-based page index
pub const DEFAULT_PAGE_PARAM: &str = "page";

/// Default query parameter carrying the page size
pub const DEFAULT_PAGE_SIZE_PARAM: &str = "pageSize";

// ============================================================================
// Page Request Template
// ============================================================================

/// How to build the HTTP request for one page
#[derive(Debug, Clone)]
pub struct PageRequest {
    /// Path template, e.g. `/search/{{ key }}`
    pub path: String,
    /// HTTP method
    pub method: Method,
    /// Query parameter for the page index; `None` leaves it out
    pub page_param: Option<String>,
    /// Query parameter for the page size; `None` leaves it out
    pub page_size_param: Option<String>,
    /// Extra query parameters; values may be templates
    pub query: Vec<(String, String)>,
    /// Extra request headers; values may be templates
    pub headers: HashMap<String, String>,
    /// JSON body for POST requests; string leaves may be templates
    pub body: Option<Value>,
    /// Values exposed to templates under `vars`
    pub vars: Value,
}

impl PageRequest {
    /// Create a GET request for the given path template
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method: Method::GET,
            page_param: Some(DEFAULT_PAGE_PARAM.to_string()),
            page_size_param: Some(DEFAULT_PAGE_SIZE_PARAM.to_string()),
            query: Vec::new(),
            headers: HashMap::new(),
            body: None,
            vars: Value::Null,
        }
    }

    /// Set the HTTP method
    #[must_use]
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Set the paging parameter names
    #[must_use]
    pub fn with_page_params(
        mut self,
        page_param: Option<String>,
        page_size_param: Option<String>,
    ) -> Self {
        self.page_param = page_param;
        self.page_size_param = page_size_param;
        self
    }

    /// Add a query parameter
    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Add a header
    #[must_use]
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Set the JSON body
    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Set template variables
    #[must_use]
    pub fn with_vars(mut self, vars: Value) -> Self {
        self.vars = vars;
        self
    }

    /// Render the path and request config for one page
    pub fn render(&self, ctx: &TemplateContext) -> Result<(String, RequestConfig)> {
        let path = render_path(&self.path, ctx)?;
        let mut config = RequestConfig::new();

        if let (Some(param), Some(page)) = (&self.page_param, ctx.get("page")) {
            config = config.query(param, template_value(page));
        }
        if let (Some(param), Some(size)) = (&self.page_size_param, ctx.get("page_size")) {
            config = config.query(param, template_value(size));
        }
        for (key, value) in &self.query {
            config = config.query(key, render(value, ctx)?);
        }
        for (key, value) in &self.headers {
            config = config.header(key, render(value, ctx)?);
        }
        if let Some(ref body) = self.body {
            config = config.json(render_json(body, ctx)?);
        }

        Ok((path, config))
    }
}

fn template_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Render every string leaf of a JSON body
fn render_json(value: &Value, ctx: &TemplateContext) -> Result<Value> {
    Ok(match value {
        Value::String(s) => Value::String(render(s, ctx)?),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|v| render_json(v, ctx))
                .collect::<Result<_>>()?,
        ),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| Ok((k.clone(), render_json(v, ctx)?)))
                .collect::<Result<_>>()?,
        ),
        other => other.clone(),
    })
}

// ============================================================================
// HTTP Page Fetcher
// ============================================================================

/// Fetches pages of JSON items from a REST endpoint
///
/// The dependency key is serialized to JSON and exposed to templates as
/// `key`, so both plain strings (`{{ key }}`) and structured keys
/// (`{{ key.user_id }}`) work.
#[derive(Clone)]
pub struct HttpPageFetcher {
    client: Arc<HttpClient>,
    request: PageRequest,
    decoder: Arc<dyn PageDecoder>,
}

impl HttpPageFetcher {
    /// Create a fetcher with the default JSON decoder
    pub fn new(client: Arc<HttpClient>, request: PageRequest) -> Self {
        Self::with_decoder(client, request, Arc::new(JsonPageDecoder::default()))
    }

    /// Create a fetcher with a custom decoder
    pub fn with_decoder(
        client: Arc<HttpClient>,
        request: PageRequest,
        decoder: Arc<dyn PageDecoder>,
    ) -> Self {
        Self {
            client,
            request,
            decoder,
        }
    }

    /// The decoder used for responses, also the source of item ids
    pub fn decoder(&self) -> Arc<dyn PageDecoder> {
        Arc::clone(&self.decoder)
    }

    /// The request template
    pub fn request(&self) -> &PageRequest {
        &self.request
    }

    fn context<K: Serialize>(&self, page_index: u32, page_size: u32, key: &K) -> Result<TemplateContext> {
        let key = serde_json::to_value(key)
            .map_err(|e| Error::template(format!("dependency key is not serializable: {e}")))?;
        let mut ctx = TemplateContext::for_page(key, page_index, page_size);
        ctx.set_vars(self.request.vars.clone());
        Ok(ctx)
    }
}

#[async_trait]
impl<K> PageFetcher<Value, K> for HttpPageFetcher
where
    K: DependencyKey + Serialize,
{
    async fn fetch_page(&self, page_index: u32, page_size: u32, key: &K) -> Result<PageResult<Value>> {
        let ctx = self.context(page_index, page_size, key)?;
        let (path, config) = self.request.render(&ctx)?;

        debug!("Fetching page {page_index} (size {page_size}) from {path}");
        let body = self
            .client
            .request_text(self.request.method.into(), &path, config)
            .await?;

        self.decoder.decode(&body)
    }
}

impl std::fmt::Debug for HttpPageFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpPageFetcher")
            .field("client", &self.client)
            .field("request", &self.request)
            .finish_non_exhaustive()
    }
}
