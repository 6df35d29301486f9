//! BoardGameGeek XML API client implementation.

use crate::error::{BggError, Result};
use crate::normalize;
use crate::rate_limit::RateLimiter;
use crate::sanitize::sanitize_xml;
use crate::types::{AuthMode, Query};
use crate::{
    DEFAULT_BASE_URL, DEFAULT_MAX_RETRIES, DEFAULT_REQUESTS_PER_SECOND, DEFAULT_RETRY_DELAY,
    DEFAULT_USER_AGENT,
};
use reqwest::header::COOKIE;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::any::type_name;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Configuration for the BGG client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL for the XML API2 endpoints
    pub base_url: String,
    /// User agent string for HTTP requests
    pub user_agent: String,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// How many times a 202 (queued) response is retried before giving up
    pub max_retries: u32,
    /// Pause between 202 retries
    pub retry_delay: Duration,
    /// Request rate shared by all calls through one client
    pub requests_per_second: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_seconds: 30,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
            requests_per_second: DEFAULT_REQUESTS_PER_SECOND,
        }
    }
}

#[derive(Clone)]
enum Credentials {
    None,
    ApiKey(String),
    Cookie(String),
}

/// Main BoardGameGeek XML API client.
///
/// Cloning is cheap; clones share the HTTP connection pool and the rate
/// limiter, so they are paced together.
#[derive(Clone)]
pub struct BggClient {
    /// HTTP client
    http_client: Client,
    /// Client configuration
    config: ClientConfig,
    /// How requests are authenticated
    credentials: Credentials,
    /// Pacing shared by every request from this client
    limiter: Arc<RateLimiter>,
}

impl BggClient {
    /// Create an unauthenticated client with default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(ClientConfig::default())
    }

    /// Create an unauthenticated client with custom configuration
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        let http_client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            http_client,
            limiter: Arc::new(RateLimiter::new(config.requests_per_second)),
            config,
            credentials: Credentials::None,
        })
    }

    /// Authenticate with an API key sent as a bearer token.
    ///
    /// Replaces any cookie set earlier.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.credentials = Credentials::ApiKey(key.into());
        self
    }

    /// Authenticate with a raw `Cookie` header value, e.g.
    /// `"bggusername=me; SessionID=abc"`.
    ///
    /// Replaces any API key set earlier.
    pub fn with_cookie(mut self, cookie: impl Into<String>) -> Self {
        self.credentials = Credentials::Cookie(cookie.into());
        self
    }

    /// The rate limiter pacing this client's requests
    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Which authentication mode is in use
    pub fn auth_mode(&self) -> AuthMode {
        match self.credentials {
            Credentials::None => AuthMode::None,
            Credentials::ApiKey(_) => AuthMode::ApiKey,
            Credentials::Cookie(_) => AuthMode::Cookie,
        }
    }

    /// The API key, when authenticating with one
    pub fn api_key(&self) -> Option<&str> {
        match &self.credentials {
            Credentials::ApiKey(key) => Some(key),
            _ => None,
        }
    }

    /// The cookie header value, when authenticating with one
    pub fn cookie(&self) -> Option<&str> {
        match &self.credentials {
            Credentials::Cookie(cookie) => Some(cookie),
            _ => None,
        }
    }

    /// Client configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Run a query against the configured base URL
    pub async fn query<T: DeserializeOwned>(&self, query: &Query) -> Result<T> {
        let url = query.to_url(&self.config.base_url)?;
        self.fetch_and_decode(&url).await
    }

    /// Fetch `url` and decode the XML body into `T`.
    ///
    /// See [`fetch_and_decode_with_cancel`](Self::fetch_and_decode_with_cancel).
    pub async fn fetch_and_decode<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        self.fetch_and_decode_with_cancel(url, &CancellationToken::new())
            .await
    }

    /// Fetch `url` and decode the XML body into `T`, giving up when `cancel` fires.
    ///
    /// Every attempt waits for the rate limiter first. A 202 response means BGG
    /// queued the request; it is retried after `retry_delay`, up to
    /// `max_retries` times. Any other non-200 status, a transport failure or a
    /// decode failure ends the call immediately.
    pub async fn fetch_and_decode_with_cancel<T: DeserializeOwned>(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<T> {
        let max_retries = self.config.max_retries;

        for attempt in 0..=max_retries {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(BggError::Cancelled),
                _ = self.limiter.take() => {}
            }

            debug!(url, attempt, "Making request");
            let request = self.authorize(self.http_client.get(url));

            let response = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(BggError::Cancelled),
                response = request.send() => response.map_err(|e| {
                    warn!(url, error = %e, "HTTP request failed");
                    e
                })?,
            };

            let status = response.status();
            if status == StatusCode::ACCEPTED {
                drop(response);
                if attempt == max_retries {
                    warn!(url, attempt, "BGG never finished processing request");
                    return Err(BggError::max_retries_exceeded(attempt));
                }

                info!(
                    url,
                    attempt,
                    delay_ms = self.config.retry_delay.as_millis() as u64,
                    "Request queued by BGG, retrying"
                );
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(BggError::Cancelled),
                    _ = tokio::time::sleep(self.config.retry_delay) => {}
                }
                continue;
            }

            if status != StatusCode::OK {
                warn!(url, status = status.as_u16(), "Unexpected status code");
                return Err(BggError::UnexpectedStatusCode {
                    status: status.as_u16(),
                });
            }

            let body = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(BggError::Cancelled),
                body = response.bytes() => body,
            };
            let body = match body {
                Ok(body) if !body.is_empty() => body,
                Ok(_) => return Err(BggError::EmptyResponse),
                Err(e) => {
                    warn!(url, error = %e, "Failed to read response body");
                    return Err(BggError::EmptyResponse);
                }
            };

            return decode_xml(&sanitize_xml(&body));
        }

        Err(BggError::RetriesExhausted)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.credentials {
            Credentials::None => request,
            Credentials::ApiKey(key) => request.bearer_auth(key),
            Credentials::Cookie(cookie) => request.header(COOKIE, cookie.as_str()),
        }
    }
}

/// Decode an XML document into `T`.
///
/// When the strict decoder rejects the document it is rebuilt through
/// [`normalize::regenerate`] and decoded once more. The rebuilt document has no
/// empty attribute-less elements, so a `String` field that BGG sends as
/// `<description/>` is absent on that second pass; mark such fields
/// `#[serde(default)]` to get `""` instead of a [`BggError::Unmarshal`].
pub fn decode_xml<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    let text = String::from_utf8_lossy(body);

    match quick_xml::de::from_str::<T>(&text) {
        Ok(value) => Ok(value),
        Err(strict_error) => {
            warn!(
                target_type = type_name::<T>(),
                error = %strict_error,
                "Strict XML decode failed, retrying with regenerated document"
            );
            let regenerated = normalize::regenerate(text.as_bytes())?;
            quick_xml::de::from_str::<T>(&regenerated).map_err(|source| BggError::Unmarshal {
                type_name: type_name::<T>(),
                source,
            })
        }
    }
}
