//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests, including:
//! - Building HTTP clients with and without certificate verification
//! - GET requests for page bodies and image bytes
//! - HEAD requests for content-type probing
//! - The single verify-then-fallback retry
//! - Error classification

use crate::config::{CacheConfig, Config, HttpConfig};
use crate::fetch::cache::{NoCache, ResponseCache, TtlCache};
use crate::fetch::headers::Headers;
use crate::{FetchError, FetchResult};
use reqwest::{redirect::Policy, Client, Method, Response};
use std::sync::Arc;
use std::time::Duration;

/// Maximum number of redirects followed per request
const MAX_REDIRECTS: usize = 10;

/// A successful HTTP response with its body fully read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedResponse {
    /// Final URL after redirects
    pub final_url: String,

    /// HTTP status code (always 2xx)
    pub status_code: u16,

    /// Response headers
    pub headers: Headers,

    /// Response body
    pub body: Vec<u8>,
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The HTTP configuration
/// * `verify_certificates` - Whether TLS certificates are validated
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(
    config: &HttpConfig,
    verify_certificates: bool,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .danger_accept_invalid_certs(!verify_certificates)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Resilient HTTP fetcher
///
/// Every request is first sent with certificate verification enabled. If that
/// attempt fails at the transport level (connection, TLS, timeout, body read)
/// it is sent exactly once more on a client that accepts invalid certificates.
/// HTTP status failures are final and are not retried.
///
/// Cloning is cheap: clients and caches are shared.
#[derive(Clone)]
pub struct Fetcher {
    secure: Client,
    insecure: Client,
    content_cache: Arc<dyn ResponseCache<FetchedResponse>>,
    header_cache: Arc<dyn ResponseCache<Headers>>,
}

impl std::fmt::Debug for Fetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fetcher").finish_non_exhaustive()
    }
}

impl Fetcher {
    /// Creates a fetcher without response caching
    pub fn new(config: &HttpConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            secure: build_http_client(config, true)?,
            insecure: build_http_client(config, false)?,
            content_cache: Arc::new(NoCache),
            header_cache: Arc::new(NoCache),
        })
    }

    /// Creates a fetcher with caching set up from the configuration
    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        let fetcher = Self::new(&config.http)?;
        Ok(match ttl_of(&config.cache) {
            Some(ttl) => fetcher.with_caches(
                Arc::new(TtlCache::<FetchedResponse>::new(ttl)),
                Arc::new(TtlCache::<Headers>::new(ttl)),
            ),
            None => fetcher,
        })
    }

    /// Replaces the caches used for page bodies and header sets
    pub fn with_caches(
        mut self,
        content_cache: Arc<dyn ResponseCache<FetchedResponse>>,
        header_cache: Arc<dyn ResponseCache<Headers>>,
    ) -> Self {
        self.content_cache = content_cache;
        self.header_cache = header_cache;
        self
    }

    /// Fetches a page body, consulting the content cache first
    ///
    /// An empty body is reported as [`FetchError::NoContent`].
    pub async fn fetch_content(&self, url: &str) -> FetchResult<FetchedResponse> {
        if let Some(cached) = self.content_cache.get(url) {
            tracing::debug!("Content cache hit for {}", url);
            return Ok(cached);
        }

        let response = self.get_with_fallback(url).await?;
        if response.body.is_empty() {
            return Err(FetchError::NoContent {
                url: url.to_string(),
            });
        }

        self.content_cache.insert(url, response.clone());
        Ok(response)
    }

    /// Fetches a resource's bytes without touching the cache
    ///
    /// Used for image downloads, which are large and fetched once.
    pub async fn download(&self, url: &str) -> FetchResult<FetchedResponse> {
        self.get_with_fallback(url).await
    }

    /// Sends a HEAD request and reports total failure as an error
    ///
    /// Any HTTP response, whatever its status, yields its headers. Only a
    /// request that gets no response at all (after the fallback) is an error.
    /// Header sets from 2xx responses are cached.
    pub async fn probe_headers(&self, url: &str) -> FetchResult<Headers> {
        if let Some(cached) = self.header_cache.get(url) {
            tracing::debug!("Header cache hit for {}", url);
            return Ok(cached);
        }

        let (status, headers) = self.head_with_fallback(url).await?;
        if (200..300).contains(&status) {
            self.header_cache.insert(url, headers.clone());
        } else {
            tracing::debug!("HEAD {} answered with HTTP {}", url, status);
        }
        Ok(headers)
    }

    /// Sends a HEAD request, returning empty headers on total failure
    pub async fn fetch_headers(&self, url: &str) -> Headers {
        match self.probe_headers(url).await {
            Ok(headers) => headers,
            Err(e) => {
                tracing::warn!("Failed to fetch headers: {}", e);
                Headers::new()
            }
        }
    }

    async fn get_with_fallback(&self, url: &str) -> FetchResult<FetchedResponse> {
        match get_once(&self.secure, url).await {
            Err(e) if is_retryable(&e) => {
                tracing::debug!("GET {} failed ({}), retrying without verification", url, e);
                get_once(&self.insecure, url).await
            }
            result => result,
        }
    }

    async fn head_with_fallback(&self, url: &str) -> FetchResult<(u16, Headers)> {
        match head_once(&self.secure, url).await {
            Err(e) if is_retryable(&e) => {
                tracing::debug!("HEAD {} failed ({}), retrying without verification", url, e);
                head_once(&self.insecure, url).await
            }
            result => result,
        }
    }
}

/// Returns the cache TTL, or `None` when caching is disabled
fn ttl_of(config: &CacheConfig) -> Option<Duration> {
    config
        .enabled
        .then(|| Duration::from_secs(config.ttl_secs))
}

/// Performs one GET attempt on the given client
///
/// A non-2xx response is an error.
async fn get_once(client: &Client, url: &str) -> FetchResult<FetchedResponse> {
    let response = send(client, Method::GET, url).await?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::HttpStatus {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let final_url = response.url().to_string();
    let status_code = status.as_u16();
    let headers = Headers::from(response.headers());

    let body = response
        .bytes()
        .await
        .map_err(|e| classify_error(url, &e))?;

    Ok(FetchedResponse {
        final_url,
        status_code,
        headers,
        body: body.to_vec(),
    })
}

/// Performs one HEAD attempt on the given client
///
/// Returns the status alongside the headers; the status is not checked.
async fn head_once(client: &Client, url: &str) -> FetchResult<(u16, Headers)> {
    let response = send(client, Method::HEAD, url).await?;
    Ok((response.status().as_u16(), Headers::from(response.headers())))
}

/// Sends a request, mapping transport failures onto [`FetchError`]
async fn send(client: &Client, method: Method, url: &str) -> FetchResult<Response> {
    tracing::trace!("{} {}", method, url);

    client
        .request(method, url)
        .send()
        .await
        .map_err(|e| classify_error(url, &e))
}

/// Only transport-level failures earn the unverified retry
fn is_retryable(error: &FetchError) -> bool {
    matches!(
        error,
        FetchError::Network { .. } | FetchError::Timeout { .. }
    )
}

/// Maps a reqwest error onto the fetch error taxonomy
fn classify_error(url: &str, error: &reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else if error.is_builder() {
        FetchError::Parse {
            url: url.to_string(),
            message: error_chain(error),
        }
    } else {
        FetchError::Network {
            url: url.to_string(),
            message: error_chain(error),
        }
    }
}

/// Flattens an error and its sources into one line
fn error_chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_fetcher() -> Fetcher {
        Fetcher::new(&HttpConfig::default()).unwrap()
    }

    fn cached_fetcher() -> Fetcher {
        let ttl = Duration::from_secs(3600);
        test_fetcher().with_caches(
            Arc::new(TtlCache::<FetchedResponse>::new(ttl)),
            Arc::new(TtlCache::<Headers>::new(ttl)),
        )
    }

    #[test]
    fn test_build_http_client() {
        let config = HttpConfig::default();
        assert!(build_http_client(&config, true).is_ok());
        assert!(build_http_client(&config, false).is_ok());
    }

    #[test]
    fn test_ttl_of_disabled_cache() {
        let config = CacheConfig {
            enabled: false,
            ttl_secs: 60,
        };
        assert_eq!(ttl_of(&config), None);
    }

    #[test]
    fn test_ttl_of_enabled_cache() {
        let config = CacheConfig {
            enabled: true,
            ttl_secs: 60,
        };
        assert_eq!(ttl_of(&config), Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_only_transport_errors_retry() {
        let url = "https://example.com/".to_string();
        assert!(is_retryable(&FetchError::Network {
            url: url.clone(),
            message: "tls".to_string()
        }));
        assert!(is_retryable(&FetchError::Timeout { url: url.clone() }));
        assert!(!is_retryable(&FetchError::HttpStatus {
            url: url.clone(),
            status: 500
        }));
        assert!(!is_retryable(&FetchError::NoContent { url }));
    }

    #[tokio::test]
    async fn test_fetch_content_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<html></html>")
                    .insert_header("content-type", "text/html"),
            )
            .mount(&server)
            .await;

        let url = format!("{}/page", server.uri());
        let response = test_fetcher().fetch_content(&url).await.unwrap();

        assert_eq!(response.status_code, 200);
        assert_eq!(response.body, b"<html></html>");
        assert_eq!(response.headers.content_type(), "text/html");
        assert_eq!(response.final_url, url);
    }

    #[tokio::test]
    async fn test_fetch_content_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let url = format!("{}/missing", server.uri());
        let result = test_fetcher().fetch_content(&url).await;

        assert_eq!(result, Err(FetchError::HttpStatus { url, status: 404 }));
    }

    #[tokio::test]
    async fn test_http_error_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let url = format!("{}/broken", server.uri());
        assert!(test_fetcher().download(&url).await.is_err());
    }

    #[tokio::test]
    async fn test_fetch_content_empty_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let url = format!("{}/empty", server.uri());
        let result = test_fetcher().fetch_content(&url).await;

        assert!(matches!(result, Err(FetchError::NoContent { .. })));
    }

    #[tokio::test]
    async fn test_download_allows_empty_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let url = format!("{}/empty.png", server.uri());
        let response = test_fetcher().download(&url).await.unwrap();
        assert!(response.body.is_empty());
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        // Nothing listens on port 1
        let result = test_fetcher().fetch_content("http://127.0.0.1:1/").await;
        assert!(matches!(result, Err(FetchError::Network { .. })));
    }

    #[tokio::test]
    async fn test_invalid_url_is_parse_error() {
        let result = test_fetcher().download("not a url").await;
        assert!(matches!(result, Err(FetchError::Parse { .. })));
    }

    #[tokio::test]
    async fn test_fetch_headers() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(200).insert_header("content-type", "image/webp"))
            .mount(&server)
            .await;

        let url = format!("{}/img", server.uri());
        let headers = test_fetcher().fetch_headers(&url).await;
        assert_eq!(headers.content_type(), "image/webp");
    }

    #[tokio::test]
    async fn test_fetch_headers_failure_is_empty() {
        let headers = test_fetcher().fetch_headers("http://127.0.0.1:1/x").await;
        assert!(headers.is_empty());
    }

    #[tokio::test]
    async fn test_probe_headers_keeps_error_status_headers() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(404).insert_header("content-type", "text/html"))
            .expect(1)
            .mount(&server)
            .await;

        let url = format!("{}/missing.jpg", server.uri());
        let headers = test_fetcher().probe_headers(&url).await.unwrap();
        assert_eq!(headers.content_type(), "text/html");
    }

    #[tokio::test]
    async fn test_probe_headers_unreachable_is_error() {
        let result = test_fetcher().probe_headers("http://127.0.0.1:1/x.png").await;
        assert!(matches!(result, Err(FetchError::Network { .. })));
    }

    #[tokio::test]
    async fn test_error_status_headers_not_cached() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(503).insert_header("content-type", "text/plain"))
            .expect(2)
            .mount(&server)
            .await;

        let fetcher = cached_fetcher();
        let url = format!("{}/img", server.uri());
        fetcher.probe_headers(&url).await.unwrap();
        fetcher.probe_headers(&url).await.unwrap();
    }

    #[tokio::test]
    async fn test_content_cache_avoids_second_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("cached"))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = cached_fetcher();
        let url = format!("{}/page", server.uri());
        let first = fetcher.fetch_content(&url).await.unwrap();
        let second = fetcher.fetch_content(&url).await.unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .expect(2)
            .mount(&server)
            .await;

        let fetcher = cached_fetcher();
        let url = format!("{}/flaky", server.uri());
        assert!(fetcher.fetch_content(&url).await.is_err());
        assert!(fetcher.fetch_content(&url).await.is_err());
    }

    #[tokio::test]
    async fn test_download_bypasses_cache() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8, 2, 3]))
            .expect(2)
            .mount(&server)
            .await;

        let fetcher = cached_fetcher();
        let url = format!("{}/a.png", server.uri());
        fetcher.download(&url).await.unwrap();
        fetcher.download(&url).await.unwrap();
    }

    #[tokio::test]
    async fn test_header_cache_avoids_second_request() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(200).insert_header("content-type", "image/png"))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = cached_fetcher();
        let url = format!("{}/img", server.uri());
        fetcher.fetch_headers(&url).await;
        let headers = fetcher.fetch_headers(&url).await;
        assert_eq!(headers.content_type(), "image/png");
    }

    fn impatient_fetcher() -> Fetcher {
        let config = HttpConfig {
            timeout_secs: 1,
            connect_timeout_secs: 1,
            ..HttpConfig::default()
        };
        Fetcher::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_get_timeout_retried_exactly_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .expect(2)
            .mount(&server)
            .await;

        let url = format!("{}/slow.png", server.uri());
        let result = impatient_fetcher().download(&url).await;
        assert_eq!(result, Err(FetchError::Timeout { url }));
    }

    #[tokio::test]
    async fn test_head_timeout_retried_exactly_once() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .expect(2)
            .mount(&server)
            .await;

        let url = format!("{}/slow", server.uri());
        let result = impatient_fetcher().probe_headers(&url).await;
        assert_eq!(result, Err(FetchError::Timeout { url }));
    }

    #[tokio::test]
    async fn test_fallback_attempt_recovers() {
        let server = MockServer::start().await;
        // First attempt stalls past the timeout, the second one answers
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("second try"))
            .expect(1)
            .mount(&server)
            .await;

        let url = format!("{}/page", server.uri());
        let response = impatient_fetcher().fetch_content(&url).await.unwrap();
        assert_eq!(response.body, b"second try");
    }

    #[tokio::test]
    async fn test_head_fallback_attempt_recovers() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(200).insert_header("content-type", "image/gif"))
            .expect(1)
            .mount(&server)
            .await;

        let url = format!("{}/img", server.uri());
        let headers = impatient_fetcher().fetch_headers(&url).await;
        assert_eq!(headers.content_type(), "image/gif");
    }

    #[test]
    fn test_error_chain_single() {
        let error = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        assert_eq!(error_chain(&error), "boom");
    }
}
