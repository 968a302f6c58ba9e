//! Network side of the cache: the [`Fetcher`] seam and its reqwest client.
//!
//! ### Response semantics
//! - Any HTTP response, whatever its status, is returned as a
//!   [`NetworkResponse`]; callers decide what a non-ok status means.
//! - Transport failures (connect, DNS, TLS, reset) are `Error::Network`.
//! - Timeouts are `Error::FetchTimeout`; the bound comes from configuration.
//! - Bodies larger than `max_bytes` are `Error::FetchTooLarge`.

pub mod url;

use bytes::Bytes;
use reqwest::{Client, Url, header};
use std::time::{Duration, Instant};

pub use reqwest::StatusCode;

pub use self::url::{UrlError, resolve};

use swcache_core::{AppConfig, CacheEntry, Error, Headers, RequestKey};

/// A response as it came off the network (or out of a store).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkResponse {
    /// The URL that was requested
    pub url: Url,
    /// HTTP status code
    pub status: StatusCode,
    /// Response headers
    pub headers: Headers,
    /// Response body bytes
    pub body: Bytes,
}

impl NetworkResponse {
    /// 2xx, the only responses the cache stores.
    pub fn is_ok(&self) -> bool {
        self.status.is_success()
    }

    /// Snapshot this response as a store entry stamped `stored_at`.
    pub fn to_entry(&self, stored_at: chrono::DateTime<chrono::Utc>) -> CacheEntry {
        CacheEntry {
            key: RequestKey::get(self.url.as_str()),
            status: self.status.as_u16(),
            headers: self.headers.clone(),
            body: self.body.clone(),
            stored_at,
        }
    }

    /// Rebuild a response from a stored entry, byte for byte.
    pub fn from_entry(url: Url, entry: CacheEntry) -> Self {
        Self {
            url,
            status: StatusCode::from_u16(entry.status).unwrap_or(StatusCode::OK),
            headers: entry.headers,
            body: entry.body,
        }
    }
}

/// Issues GET requests on behalf of the cache.
#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch `url`. Non-ok statuses are responses, not errors.
    async fn fetch(&self, url: &Url) -> Result<NetworkResponse, Error>;
}

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "swcache/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "swcache/0.1".to_string(),
            max_bytes: 5 * 1024 * 1024,
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

/// HTTP fetch client backed by reqwest.
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
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

fn classify_reqwest_error(err: reqwest::Error) -> Error {
    if err.is_timeout() { Error::FetchTimeout(err.to_string()) } else { Error::Network(err.to_string()) }
}

fn convert_headers(map: &header::HeaderMap) -> Headers {
    map.iter()
        .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str(), v)))
        .collect()
}

#[async_trait::async_trait]
impl Fetcher for FetchClient {
    async fn fetch(&self, url: &Url) -> Result<NetworkResponse, Error> {
        let start = Instant::now();

        let response = self
            .http
            .get(url.as_str())
            .send()
            .await
            .map_err(classify_reqwest_error)?;

        let status = response.status();

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes)));
        }

        let headers = convert_headers(response.headers());

        let body = response.bytes().await.map_err(classify_reqwest_error)?;

        if body.len() > self.config.max_bytes {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", body.len(), self.config.max_bytes)));
        }

        tracing::debug!(
            "fetched {} -> {} in {}ms ({} bytes)",
            url,
            status.as_u16(),
            start.elapsed().as_millis(),
            body.len()
        );

        Ok(NetworkResponse { url: url.clone(), status, headers, body })
    }
}
