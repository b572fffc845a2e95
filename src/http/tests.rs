//! Tests for the HTTP module

use super::*;
use crate::decode::{JsonPageDecoder, ResponseShape};
use crate::error::Error;
use crate::pagination::PageFetcher;
use crate::types::{BackoffType, Method};
use pretty_assertions::assert_eq;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn get(client: &HttpClient, path: &str) -> crate::error::Result<reqwest::Response> {
    client
        .request(reqwest::Method::GET, path, RequestConfig::default())
        .await
}

fn test_client(base_url: &str) -> HttpClient {
    let config = HttpClientConfig::builder()
        .base_url(base_url)
        .max_retries(2)
        .backoff(
            BackoffType::Constant,
            Duration::from_millis(10),
            Duration::from_secs(1),
        )
        .no_rate_limit()
        .build();
    HttpClient::with_config(config).unwrap()
}

// ============================================================================
// Config Tests
// ============================================================================

#[test]
fn test_http_client_config_default() {
    let config = HttpClientConfig::default();
    assert_eq!(config.timeout, Duration::from_secs(30));
    assert_eq!(config.max_retries, 3);
    assert!(config.base_url.is_none());
    assert!(config.rate_limit.is_some());
    assert!(config.user_agent.starts_with("solidafy-pager/"));
}

#[test]
fn test_http_client_config_builder() {
    let config = HttpClientConfig::builder()
        .base_url("https://api.example.com")
        .timeout(Duration::from_secs(60))
        .max_retries(5)
        .backoff(
            BackoffType::Linear,
            Duration::from_millis(200),
            Duration::from_secs(30),
        )
        .header("X-Custom", "value")
        .user_agent("test-agent/1.0")
        .build();

    assert_eq!(config.base_url, Some("https://api.example.com".to_string()));
    assert_eq!(config.max_retries, 5);
    assert_eq!(config.backoff_type, BackoffType::Linear);
    assert_eq!(
        config.default_headers.get("X-Custom"),
        Some(&"value".to_string())
    );
    assert_eq!(config.user_agent, "test-agent/1.0");
}

#[test]
fn test_request_config_query_order() {
    let config = RequestConfig::new()
        .query("page", "1")
        .query("pageSize", "10")
        .query("q", "rust");

    let keys: Vec<&str> = config.query.iter().map(|(k, _)| k.as_str()).collect();
    assert_eq!(keys, vec!["page", "pageSize", "q"]);
    assert_eq!(config.query_value("pageSize"), Some("10"));
    assert_eq!(config.query_value("missing"), None);
}

#[test]
fn test_build_url() {
    let client = test_client("https://api.example.com/v1/");
    assert_eq!(client.build_url("/posts"), "https://api.example.com/v1/posts");
    assert_eq!(
        client.build_url("http://other.example.com/x"),
        "http://other.example.com/x"
    );
}

#[test]
fn test_calculate_backoff() {
    let exponential = HttpClient::with_config(
        HttpClientConfig::builder()
            .backoff(
                BackoffType::Exponential,
                Duration::from_millis(100),
                Duration::from_millis(500),
            )
            .no_rate_limit()
            .build(),
    )
    .unwrap();
    assert_eq!(exponential.calculate_backoff(0), Duration::from_millis(100));
    assert_eq!(exponential.calculate_backoff(2), Duration::from_millis(400));
    assert_eq!(exponential.calculate_backoff(3), Duration::from_millis(500));
    assert_eq!(exponential.calculate_backoff(40), Duration::from_millis(500));

    let linear = HttpClient::with_config(
        HttpClientConfig::builder()
            .backoff(
                BackoffType::Linear,
                Duration::from_millis(100),
                Duration::from_secs(10),
            )
            .no_rate_limit()
            .build(),
    )
    .unwrap();
    assert_eq!(linear.calculate_backoff(2), Duration::from_millis(300));
}

// ============================================================================
// Client Tests
// ============================================================================

#[tokio::test]
async fn test_http_client_default_headers() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/data"))
        .and(header("X-API-Key", "secret123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": 42})))
        .mount(&mock_server)
        .await;

    let config = HttpClientConfig::builder()
        .base_url(mock_server.uri())
        .header("X-API-Key", "secret123")
        .no_rate_limit()
        .build();
    let client = HttpClient::with_config(config).unwrap();

    let body = client
        .request_text(reqwest::Method::GET, "/api/data", RequestConfig::default())
        .await
        .unwrap();
    let data: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(data["value"], 42);
}

#[tokio::test]
async fn test_http_client_404_is_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Not found"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server.uri());
    let err = get(&client, "/api/missing").await.unwrap_err();

    assert!(matches!(err, Error::HttpStatus { status: 404, ref body } if body == "Not found"));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_http_client_retry_on_500() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/flaky"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server.uri());
    let response = get(&client, "/api/flaky").await.unwrap();

    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_http_client_retries_exhausted() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/always-fail"))
        .respond_with(ResponseTemplate::new(503).set_body_string("down"))
        .expect(3)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server.uri());
    let err = get(&client, "/api/always-fail").await.unwrap_err();

    assert!(matches!(err, Error::HttpStatus { status: 503, .. }));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_http_client_rate_limit_retry() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/limited"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "0"))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/limited"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server.uri());
    let response = get(&client, "/api/limited").await.unwrap();

    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_http_client_rate_limited_without_retries() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/limited"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "7"))
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server.uri());
    let err = client
        .request(
            reqwest::Method::GET,
            "/api/limited",
            RequestConfig::new().retries(0),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::RateLimited {
            retry_after_seconds: 7
        }
    ));
}

// ============================================================================
// Rate Limiter Tests
// ============================================================================

#[test]
fn test_rate_limiter_config_default() {
    let config = RateLimiterConfig::default();
    assert_eq!(config, RateLimiterConfig::new(10, 10));
}

#[tokio::test]
async fn test_rate_limiter_allows_burst() {
    let limiter = RateLimiter::new(&RateLimiterConfig::new(1, 5));

    for _ in 0..5 {
        assert!(limiter.try_acquire());
    }
    assert!(!limiter.try_acquire());
}

#[tokio::test]
async fn test_rate_limiter_zero_config_is_clamped() {
    let limiter = RateLimiter::new(&RateLimiterConfig::new(0, 0));
    assert!(limiter.try_acquire());
    assert!(!limiter.wait_with_timeout(Duration::from_millis(20)).await);
}

// ============================================================================
// Page Request Tests
// ============================================================================

#[test]
fn test_page_request_render() {
    let request = PageRequest::new("/search/{{ key }}")
        .with_query("sort", "{{ vars.sort }}")
        .with_header("X-Locale", "{{ locale }}")
        .with_vars(json!({"sort": "recent", "locale": "en"}));

    let mut ctx = crate::template::TemplateContext::for_page("rust lang", 2, 10);
    ctx.set_vars(request.vars.clone());
    let (path, config) = request.render(&ctx).unwrap();

    assert_eq!(path, "/search/rust%20lang");
    assert_eq!(config.query_value("page"), Some("2"));
    assert_eq!(config.query_value("pageSize"), Some("10"));
    assert_eq!(config.query_value("sort"), Some("recent"));
    assert_eq!(config.headers.get("X-Locale"), Some(&"en".to_string()));
}

#[test]
fn test_page_request_without_page_params() {
    let request = PageRequest::new("/posts/{{ page }}").with_page_params(None, None);
    let ctx = crate::template::TemplateContext::for_page("all", 3, 10);
    let (path, config) = request.render(&ctx).unwrap();

    assert_eq!(path, "/posts/3");
    assert!(config.query.is_empty());
}

#[test]
fn test_page_request_undefined_variable() {
    let request = PageRequest::new("/users/{{ key.user_id }}");
    let ctx = crate::template::TemplateContext::for_page("plain", 1, 10);
    let err = request.render(&ctx).unwrap_err();
    assert!(matches!(err, Error::UndefinedVariable { .. }));
}

// ============================================================================
// HttpPageFetcher Tests
// ============================================================================

#[tokio::test]
async fn test_fetcher_posts_page() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/categories/design/posts"))
        .and(query_param("page", "2"))
        .and(query_param("pageSize", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "posts": [{"id": "p11"}, {"id": "p12"}],
            "totalCount": 12
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = Arc::new(test_client(&mock_server.uri()));
    let decoder = Arc::new(JsonPageDecoder::new(ResponseShape::new("posts", "totalCount")));
    let fetcher = HttpPageFetcher::with_decoder(
        client,
        PageRequest::new("/categories/{{ key }}/posts"),
        decoder,
    );

    let page = fetcher
        .fetch_page(2, 10, &"design".to_string())
        .await
        .unwrap();

    assert_eq!(page.items, vec![json!({"id": "p11"}), json!({"id": "p12"})]);
    assert_eq!(page.total_count, 12);
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
struct FollowerKey {
    user_id: String,
    kind: String,
}

#[tokio::test]
async fn test_fetcher_structured_key_and_custom_params() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/u-7/followers"))
        .and(query_param("offset", "1"))
        .and(query_param("limit", "20"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "peoples": [{"id": 1}],
            "total": 1
        })))
        .mount(&mock_server)
        .await;

    let client = Arc::new(test_client(&mock_server.uri()));
    let request = PageRequest::new("/users/{{ key.user_id }}/{{ key.kind }}")
        .with_page_params(Some("offset".into()), Some("limit".into()));
    let decoder = Arc::new(JsonPageDecoder::new(ResponseShape::new("peoples", "total")));
    let fetcher = HttpPageFetcher::with_decoder(client, request, decoder);

    let key = FollowerKey {
        user_id: "u-7".into(),
        kind: "followers".into(),
    };
    let page = fetcher.fetch_page(1, 20, &key).await.unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.total_count, 1);
}

#[tokio::test]
async fn test_fetcher_post_body_is_templated() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/search"))
        .and(body_json(json!({"query": "rust", "filters": ["{{"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [],
            "totalCount": 0
        })))
        .mount(&mock_server)
        .await;

    let client = Arc::new(test_client(&mock_server.uri()));
    let request = PageRequest::new("/search")
        .with_method(Method::POST)
        .with_body(json!({"query": "{{ key }}", "filters": ["{{"]}));
    let fetcher = HttpPageFetcher::new(client, request);

    let page = fetcher.fetch_page(1, 10, &"rust".to_string()).await.unwrap();
    assert!(page.items.is_empty());
}

#[tokio::test]
async fn test_fetcher_malformed_payload_is_protocol_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/posts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": "nope",
            "totalCount": 3
        })))
        .mount(&mock_server)
        .await;

    let client = Arc::new(test_client(&mock_server.uri()));
    let fetcher = HttpPageFetcher::new(client, PageRequest::new("/posts"));

    let err = fetcher
        .fetch_page(1, 10, &"all".to_string())
        .await
        .unwrap_err();
    assert!(err.is_protocol());
}
