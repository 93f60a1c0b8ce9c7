//! Network access for the worker.
//!
//! Strategies only see the [`Network`] trait; [`FetchClient`] is the real
//! implementation over reqwest.
//!
//! - A fetch that resolves with any status (including 4xx/5xx) is `Ok`
//! - Transport failures (offline, DNS, reset, timeout) are `NetworkFailure`
//! - Bodies above `max_bytes` are rejected with `FetchTooLarge`

pub mod url;

use async_trait::async_trait;
use reqwest::{Client, header};
use std::time::{Duration, Instant};

pub use self::url::{UrlError, canonicalize, resolve};

use swcache_core::{AppConfig, Error, Request, Response};

/// Anything that can turn a request into a response over the network.
#[async_trait]
pub trait Network: Send + Sync {
    async fn fetch(&self, request: &Request) -> Result<Response, Error>;
}

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "swcache/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 10MB)
    pub max_bytes: usize,

    /// Host timeout applied to every request (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "swcache/0.1".to_string(),
            max_bytes: 10 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            ..Default::default()
        }
    }
}

/// HTTP client used by the worker for every network access.
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::NetworkFailure(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    fn check_size(&self, len: usize) -> Result<(), Error> {
        if len > self.config.max_bytes {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes)));
        }
        Ok(())
    }
}

#[async_trait]
impl Network for FetchClient {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        let start = Instant::now();

        let response = self
            .http
            .request(request.method.clone(), request.url.as_str())
            .headers(request.headers.clone())
            .body(request.body.clone())
            .send()
            .await
            .map_err(|e| Error::NetworkFailure(format!("{}: {}", request.url, e)))?;

        if let Some(len) = response.content_length() {
            self.check_size(len as usize)?;
        }

        let status = response.status();
        let headers = response.headers().clone();

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::NetworkFailure(format!("failed to read response: {}", e)))?;

        self.check_size(bytes.len())?;

        tracing::debug!(
            "fetched {} {} -> {} in {}ms ({} bytes, {})",
            request.method,
            request.url,
            status.as_u16(),
            start.elapsed().as_millis(),
            bytes.len(),
            headers
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("unknown type")
        );

        Ok(Response::new(status, headers, bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.user_agent, "swcache/0.1");
        assert_eq!(config.max_bytes, 10 * 1024 * 1024);
        assert_eq!(config.timeout, Duration::from_millis(20000));
        assert_eq!(config.max_redirects, 5);
    }

    #[test]
    fn test_fetch_config_from_app_config() {
        let app = AppConfig { user_agent: "site-worker/2".into(), timeout_ms: 1500, max_bytes: 64, ..Default::default() };
        let config = FetchConfig::from(&app);
        assert_eq!(config.user_agent, "site-worker/2");
        assert_eq!(config.timeout, Duration::from_millis(1500));
        assert_eq!(config.max_bytes, 64);
    }

    #[tokio::test]
    async fn test_fetch_client_new() {
        let client = FetchClient::new(FetchConfig::default());
        assert!(client.is_ok());
    }

    #[tokio::test]
    async fn test_size_limit() {
        let client = FetchClient::new(FetchConfig { max_bytes: 10, ..Default::default() }).unwrap();
        assert!(client.check_size(10).is_ok());
        assert!(matches!(client.check_size(11), Err(Error::FetchTooLarge(_))));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_network_failure() {
        let client = FetchClient::new(FetchConfig { timeout: Duration::from_millis(500), ..Default::default() }).unwrap();
        let request = Request::get(::url::Url::parse("http://127.0.0.1:9/unreachable").unwrap());

        let result = client.fetch(&request).await;
        assert!(matches!(result, Err(Error::NetworkFailure(_))));
    }
}
