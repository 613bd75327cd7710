//! Image fetching with retry
//!
//! - [`ImageSource`] performs exactly one GET and classifies the answer.
//! - [`HttpImageSource`] is the production source (reqwest, per-request timeout).
//! - [`Fetcher`] wraps a source with the retry policy and reports how many
//!   attempts it took, so callers and tests can see retry behavior.

use std::sync::Arc;

use bytes::Bytes;
use reqwest::StatusCode;
use reqwest::header::CONTENT_TYPE;

use crate::config::{HttpConfig, RetryConfig};
use crate::error::{FetchError, Result};
use crate::retry::download_with_retry;

/// Body of a successful (HTTP 200, non-empty) response
#[derive(Clone, Debug)]
pub struct FetchedBody {
    /// Raw response bytes
    pub bytes: Bytes,
    /// Content-Type header, if the server sent one
    pub content_type: Option<String>,
}

/// Abstraction over a single image request, enabling testability.
///
/// Implementations must not retry; [`Fetcher`] owns the retry policy.
#[async_trait::async_trait]
pub trait ImageSource: Send + Sync {
    /// Issue one GET for `url`
    async fn get(&self, url: &str) -> std::result::Result<FetchedBody, FetchError>;
}

/// Production [`ImageSource`] backed by a pooled reqwest client.
#[derive(Clone, Debug)]
pub struct HttpImageSource {
    client: reqwest::Client,
}

impl HttpImageSource {
    /// Build a client with the configured timeout and User-Agent
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { client })
    }

    /// Use an existing client (its timeout settings apply)
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl ImageSource for HttpImageSource {
    async fn get(&self, url: &str) -> std::result::Result<FetchedBody, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(&e))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(FetchError::from_status(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::from_reqwest(&e))?;
        if bytes.is_empty() {
            return Err(FetchError::EmptyBody);
        }

        Ok(FetchedBody {
            bytes,
            content_type,
        })
    }
}

/// Classified result of fetching one URL
#[derive(Clone, Debug)]
pub enum FetchOutcome {
    /// The server returned a usable body
    Fetched(FetchedBody),
    /// The server has nothing at this URL
    NotFound,
    /// Retries exhausted, or a non-retryable failure
    Failed(FetchError),
}

/// Fetch result plus how many requests it took
#[derive(Clone, Debug)]
pub struct FetchReport {
    /// Final classification
    pub outcome: FetchOutcome,
    /// Requests issued (first attempt included)
    pub attempts: u32,
}

impl FetchReport {
    /// Retries issued after the first attempt
    pub fn retries(&self) -> u32 {
        self.attempts.saturating_sub(1)
    }
}

/// [`ImageSource`] plus retry policy
#[derive(Clone)]
pub struct Fetcher {
    source: Arc<dyn ImageSource>,
    retry: RetryConfig,
    require_image_content_type: bool,
}

impl Fetcher {
    /// Fetcher over `source` using `retry`
    pub fn new(source: Arc<dyn ImageSource>, retry: RetryConfig) -> Self {
        Self {
            source,
            retry,
            require_image_content_type: false,
        }
    }

    /// Reject bodies whose Content-Type is present and not `image/*`
    pub fn require_image_content_type(mut self, require: bool) -> Self {
        self.require_image_content_type = require;
        self
    }

    /// The retry policy in use
    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    /// Fetch `url`, retrying transient failures
    ///
    /// Not-found answers return immediately; unexpected statuses fail
    /// without retry; timeouts, connection errors and 5xx are retried up to
    /// `max_retries` times with backoff.
    pub async fn fetch(&self, url: &str) -> FetchReport {
        let mut attempts = 0u32;
        let result = download_with_retry(&self.retry, || {
            attempts += 1;
            self.get_checked(url)
        })
        .await;

        let outcome = match result {
            Ok(body) => FetchOutcome::Fetched(body),
            Err(FetchError::NotFound { status }) => {
                tracing::debug!(url, status, "Image not found");
                FetchOutcome::NotFound
            }
            Err(e) => {
                tracing::debug!(url, error = %e, attempts, "Image fetch failed");
                FetchOutcome::Failed(e)
            }
        };

        FetchReport { outcome, attempts }
    }

    async fn get_checked(&self, url: &str) -> std::result::Result<FetchedBody, FetchError> {
        let body = self.source.get(url).await?;
        if self.require_image_content_type
            && let Some(content_type) = &body.content_type
            && !content_type.trim().to_ascii_lowercase().starts_with("image/")
        {
            return Err(FetchError::UnexpectedContentType(content_type.clone()));
        }
        Ok(body)
    }
}
