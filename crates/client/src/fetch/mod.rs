//! HTTP transport for the offline worker.
//!
//! ### Behavior
//! - Non-2xx statuses come back as responses; only transport failures are errors.
//! - `CacheMode::Reload` sends `Cache-Control: no-cache` so intermediaries revalidate.
//! - Responses from the configured origin are `basic`, everything else `cors`.
//! - Max redirects: 5
//! - Max body bytes: 5MB (configurable)

pub mod url;

use std::time::{Duration, Instant};

use async_trait::async_trait;
use charter_core::worker::{CacheMode, Network, Request, Response, ResponseKind};
use charter_core::{AppConfig, Error, NetworkError};
use reqwest::{Client, Method, header};

pub use self::url::{UrlError, canonicalize, resolve, resolve_in_origin, same_origin};

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "charter/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,

    /// Site origin; responses from it are same-origin (`basic`).
    pub origin: Option<::url::Url>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "charter/0.1".to_string(),
            max_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
            origin: None,
        }
    }
}

impl FetchConfig {
    pub fn from_app(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            origin: config.origin_url().ok(),
            ..Self::default()
        }
    }
}

/// reqwest-backed [`Network`].
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
            .map_err(|e| NetworkError::InvalidRequest(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    fn response_kind(&self, final_url: &::url::Url) -> ResponseKind {
        match &self.config.origin {
            Some(origin) if !same_origin(origin, final_url) => ResponseKind::Cors,
            _ => ResponseKind::Basic,
        }
    }
}

fn map_send_error(e: reqwest::Error) -> NetworkError {
    if e.is_timeout() {
        NetworkError::Timeout(e.to_string())
    } else if e.is_builder() {
        NetworkError::InvalidRequest(e.to_string())
    } else {
        NetworkError::Unreachable(e.to_string())
    }
}

#[async_trait]
impl Network for FetchClient {
    async fn fetch(&self, request: &Request, mode: CacheMode) -> Result<Response, NetworkError> {
        let start = Instant::now();
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|e| NetworkError::InvalidRequest(format!("bad method {}: {}", request.method, e)))?;

        let mut builder = self.http.request(method, request.url.as_str());
        if mode == CacheMode::Reload {
            builder = builder.header(header::CACHE_CONTROL, "no-cache").header(header::PRAGMA, "no-cache");
        }

        let response = builder.send().await.map_err(map_send_error)?;

        let status = response.status();
        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(NetworkError::TooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes)));
        }

        let final_url = response.url().clone();
        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
            .collect();

        let body = response.bytes().await.map_err(map_send_error)?;
        if body.len() > self.config.max_bytes {
            return Err(NetworkError::TooLarge(format!("{} bytes exceeds {}", body.len(), self.config.max_bytes)));
        }

        tracing::debug!(
            "fetched {} {} -> {} in {}ms ({} bytes)",
            request.method,
            request.url,
            status.as_u16(),
            start.elapsed().as_millis(),
            body.len()
        );

        Ok(Response {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body,
            kind: self.response_kind(&final_url),
            url: Some(final_url.to_string()),
        })
    }
}
