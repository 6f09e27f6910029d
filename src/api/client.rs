use crate::api::types::{CharacterPage, Episode};
use crate::util::{validate_api_url, UrlValidationError};
use futures::StreamExt;
use reqwest::redirect::Policy;
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "https://rickandmortyapi.com/api";

const MAX_RESPONSE_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// Failures of a single API request.
///
/// Callers that only care about the coarse taxonomy use
/// [`ApiError::is_transport`] and [`ApiError::is_parse`].
#[derive(Debug, Error)]
pub enum ApiError {
    /// DNS, connection, TLS or body read failure
    #[error("Request failed: {0}")]
    Network(#[source] reqwest::Error),
    /// The transport's request timeout elapsed
    #[error("Request timed out")]
    Timeout,
    /// Non-2xx response (after retries for 5xx)
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// 429 responses persisted through every retry
    #[error("Rate limited after {0} retries")]
    RateLimited(u32),
    #[error("Response too large (exceeds {0} bytes)")]
    ResponseTooLarge(usize),
    /// Body was not the JSON shape we expect
    #[error("Malformed response: {0}")]
    Parse(#[from] serde_json::Error),
    #[error(transparent)]
    InvalidUrl(#[from] UrlValidationError),
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ApiError::Timeout
        } else {
            ApiError::Network(e)
        }
    }
}

impl ApiError {
    /// Network, timeout, status and size failures.
    pub fn is_transport(&self) -> bool {
        !self.is_parse()
    }

    /// The response arrived but did not decode.
    pub fn is_parse(&self) -> bool {
        matches!(self, ApiError::Parse(_))
    }
}

/// Backoff schedule for 429 and 5xx responses: `base_delay * 2^attempt`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Fail on the first error; used by tests and one-shot tools.
    pub const fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
        }
    }

    fn delay(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(1u32 << attempt.min(16))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_secs(1),
        }
    }
}

/// Knobs for building an [`ApiClient`].
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub base_url: String,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
        }
    }
}

/// Redirects: at most 3 hops, no loops.
fn create_redirect_policy() -> Policy {
    Policy::custom(|attempt| {
        if attempt.previous().len() >= 3 {
            return attempt.error("Too many redirects (max 3)");
        }

        let url = attempt.url();
        if attempt.previous().iter().any(|prev| prev.as_str() == url.as_str()) {
            return attempt.error("Redirect loop detected");
        }

        tracing::debug!(
            to = %url,
            hop = attempt.previous().len() + 1,
            "Following redirect"
        );
        attempt.follow()
    })
}

/// HTTP client for the character API.
///
/// Cheap to clone: the inner `reqwest::Client` is reference counted.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    retry: RetryPolicy,
}

impl ApiClient {
    /// Build a client with connection pooling, keepalive and the configured
    /// request timeout.
    pub fn new(settings: &ClientSettings) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .redirect(create_redirect_policy())
            .user_agent(concat!("portal/", env!("CARGO_PKG_VERSION")))
            .pool_max_idle_per_host(8) // One page fans out to ~20 episode lookups on the same host
            .pool_idle_timeout(Duration::from_secs(30))
            .tcp_keepalive(Duration::from_secs(60))
            .timeout(settings.timeout)
            .build()?;
        Self::with_client(http, &settings.base_url, settings.retry)
    }

    /// Wrap an existing `reqwest::Client`.
    ///
    /// The base URL is validated here so a bad config fails at startup
    /// rather than on the first page request.
    pub fn with_client(
        http: reqwest::Client,
        base_url: &str,
        retry: RetryPolicy,
    ) -> Result<Self, ApiError> {
        validate_api_url(base_url)?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            retry,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn character_page_url(&self, page: u32) -> String {
        format!("{}/character?page={}", self.base_url, page)
    }

    /// `GET {base}/character?page={page}`
    pub async fn fetch_character_page(&self, page: u32) -> Result<CharacterPage, ApiError> {
        let url = self.character_page_url(page);
        let started = std::time::Instant::now();
        let result: Result<CharacterPage, ApiError> = self.get_json(&url).await;
        if let Ok(ref body) = result {
            tracing::debug!(
                page,
                results = body.results.len(),
                has_next = body.has_next(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Fetched character page"
            );
        }
        result
    }

    /// `GET {episode_url}`
    pub async fn fetch_episode(&self, episode_url: &str) -> Result<Episode, ApiError> {
        self.get_json(episode_url).await
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ApiError> {
        let url = validate_api_url(url)?;
        let bytes = self.get_with_retry(url.as_str()).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn get_with_retry(&self, url: &str) -> Result<Vec<u8>, ApiError> {
        let mut retry_count = 0;

        loop {
            let response = self.http.get(url).send().await?;
            let status = response.status();

            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                if retry_count >= self.retry.max_retries {
                    return Err(ApiError::RateLimited(retry_count));
                }
                let delay = self.retry.delay(retry_count);
                tracing::warn!(
                    url,
                    retry = retry_count,
                    delay_ms = delay.as_millis() as u64,
                    "Rate limited, backing off"
                );
                tokio::time::sleep(delay).await;
                retry_count += 1;
                continue;
            }

            if status.is_server_error() {
                if retry_count >= self.retry.max_retries {
                    return Err(ApiError::HttpStatus(status.as_u16()));
                }
                let delay = self.retry.delay(retry_count);
                tracing::warn!(
                    url,
                    status = %status,
                    retry = retry_count,
                    delay_ms = delay.as_millis() as u64,
                    "Server error, retrying after delay"
                );
                tokio::time::sleep(delay).await;
                retry_count += 1;
                continue;
            }

            // 4xx fails immediately; the API answers out-of-range pages with 404
            if !status.is_success() {
                return Err(ApiError::HttpStatus(status.as_u16()));
            }

            return read_limited_bytes(response, MAX_RESPONSE_SIZE).await;
        }
    }
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, ApiError> {
    if let Some(len) = response.content_length() {
        if len > limit as u64 {
            return Err(ApiError::ResponseTooLarge(limit));
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(ApiError::ResponseTooLarge(limit));
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}
