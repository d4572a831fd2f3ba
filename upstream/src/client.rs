use crate::backoff::BackoffPolicy;
use crate::cache::ResponseCache;
use crate::config::{ClientConfig, ConfigError};
use crate::metrics_defs::{
    UPSTREAM_NOT_FOUND, UPSTREAM_REQUEST, UPSTREAM_RETRIES_EXHAUSTED, UPSTREAM_RETRY,
};
use reqwest::StatusCode;
use shared::counter;
use tokio::time::{Duration, sleep};

/// Why a resilient request produced no body.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("upstream resource not found")]
    NotFound,

    #[error("upstream still failing after {retries} retries")]
    RetryLimitExceeded { retries: u32 },

    #[error("transport error: {0}")]
    Transport(String),
}

#[derive(thiserror::Error, Debug)]
pub enum SetupError {
    #[error("invalid client configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("could not build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Classification of a single GET attempt.
#[derive(Debug, PartialEq)]
enum FetchOutcome {
    Success(String),
    NotFound,
    // Non-2xx other than 404 (status set), or a connection level failure.
    RetryableFailure {
        status: Option<StatusCode>,
        reason: String,
    },
    // The request could not even be built, retrying cannot help.
    TransportError(String),
}

/// GET client with a response cache and capped exponential backoff.
///
/// Cheap to clone; clones share the HTTP connection pool and the cache.
#[derive(Clone)]
pub struct ResilientClient {
    http: reqwest::Client,
    cache: ResponseCache,
    backoff: BackoffPolicy,
}

impl ResilientClient {
    pub fn new(config: &ClientConfig) -> Result<Self, SetupError> {
        Self::with_cache(config, ResponseCache::from_config(&config.cache))
    }

    /// Build a client around a cache owned by the caller. Several clients may
    /// share one cache.
    pub fn with_cache(config: &ClientConfig, cache: ResponseCache) -> Result<Self, SetupError> {
        config.validate()?;
        let backoff = config.retry.policy().map_err(ConfigError::from)?;

        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()?;

        Ok(ResilientClient {
            http,
            cache,
            backoff,
        })
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    /// Fetch the body at `url`, answering from the cache when possible.
    ///
    /// On a miss, transient failures (non-2xx other than 404, connection
    /// errors, timeouts) are retried on a fresh backoff schedule, always
    /// against the network. Only successful bodies are cached.
    pub async fn send_resilient(&self, url: &str) -> Result<String, ClientError> {
        self.cache
            .get_or_try_compute(url, || self.fetch_with_retry(url))
            .await
    }

    async fn fetch_with_retry(&self, url: &str) -> Result<String, ClientError> {
        let mut backoff = self.backoff.clone();

        loop {
            match self.fetch_once(url).await {
                FetchOutcome::Success(body) => return Ok(body),
                FetchOutcome::NotFound => {
                    counter!(UPSTREAM_NOT_FOUND).increment(1);
                    tracing::debug!(url, "upstream returned 404");
                    return Err(ClientError::NotFound);
                }
                FetchOutcome::TransportError(reason) => {
                    tracing::warn!(url, %reason, "upstream request could not be sent");
                    return Err(ClientError::Transport(reason));
                }
                FetchOutcome::RetryableFailure { status, reason } => {
                    let Ok(delay) = backoff.next_delay() else {
                        counter!(UPSTREAM_RETRIES_EXHAUSTED).increment(1);
                        tracing::warn!(url, %reason, "giving up on upstream request");
                        return Err(ClientError::RetryLimitExceeded {
                            retries: backoff.max_retries(),
                        });
                    };

                    counter!(UPSTREAM_RETRY).increment(1);
                    tracing::debug!(
                        url,
                        status = status.map(|s| s.as_u16()),
                        %reason,
                        attempt = backoff.attempt(),
                        delay_ms = delay.as_millis() as u64,
                        "retrying upstream request"
                    );
                    sleep(delay).await;
                }
            }
        }
    }

    async fn fetch_once(&self, url: &str) -> FetchOutcome {
        counter!(UPSTREAM_REQUEST).increment(1);

        let response = match self.http.get(url).send().await {
            Ok(response) => response,
            Err(e) if e.is_builder() => return FetchOutcome::TransportError(e.to_string()),
            Err(e) => {
                return FetchOutcome::RetryableFailure {
                    status: None,
                    reason: e.to_string(),
                };
            }
        };

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return FetchOutcome::NotFound;
        }
        if !status.is_success() {
            return FetchOutcome::RetryableFailure {
                status: Some(status),
                reason: format!("HTTP {status}"),
            };
        }

        // A body that breaks off mid-read is as transient as a refused connection.
        match response.text().await {
            Ok(body) => FetchOutcome::Success(body),
            Err(e) => FetchOutcome::RetryableFailure {
                status: Some(status),
                reason: e.to_string(),
            },
        }
    }
}
