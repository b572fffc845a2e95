//! HTTP module
//!
//! Provides the REST edge of the engine: an HTTP client with retry, rate
//! limiting and backoff, and a page fetcher built on it.
//!
//! # Features
//!
//! - **Automatic Retries**: Configurable retry logic with backoff
//! - **Rate Limiting**: Token bucket rate limiter using governor
//! - **Backoff Strategies**: Constant, linear, and exponential backoff
//! - **Page Fetching**: Templated paths and paging query parameters

mod client;
mod fetcher;
mod rate_limit;

pub use client::{HttpClient, HttpClientConfig, HttpClientConfigBuilder, RequestConfig};
pub use fetcher::{HttpPageFetcher, PageRequest, DEFAULT_PAGE_PARAM, DEFAULT_PAGE_SIZE_PARAM};
pub use rate_limit::{RateLimiter, RateLimiterConfig};

#[cfg(test)]
mod tests;
