use crate::backoff::{BackoffError, BackoffPolicy};
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str = "MusicGenie/1.0 (genie@localhost)";

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("invalid retry settings: {0}")]
    Retry(#[from] BackoffError),

    #[error("cache ttl must be greater than zero")]
    ZeroCacheTtl,

    #[error("http timeout must be greater than zero")]
    ZeroHttpTimeout,

    #[error("user agent must not be empty")]
    EmptyUserAgent,
}

/// Retry schedule for failed upstream requests.
///
/// The defaults sit between the one-per-second and fifty-per-second limits
/// MusicBrainz has documented over time.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            max_retries: 8,
            base_delay_ms: 50,
            max_delay_ms: 5000,
        }
    }
}

impl RetryConfig {
    /// A fresh policy for one retry loop.
    pub fn policy(&self) -> Result<BackoffPolicy, BackoffError> {
        BackoffPolicy::new(
            self.max_retries,
            Duration::from_millis(self.base_delay_ms),
            Duration::from_millis(self.max_delay_ms),
        )
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_secs: u64,
    pub max_capacity: u64,
    /// Coalesce concurrent misses on the same key into one upstream fetch.
    pub single_flight: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            ttl_secs: 600,
            max_capacity: 10_000,
            single_flight: false,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClientConfig {
    pub user_agent: String,
    pub http_timeout_secs: u64,
    pub retry: RetryConfig,
    pub cache: CacheConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            user_agent: DEFAULT_USER_AGENT.into(),
            http_timeout_secs: 30,
            retry: RetryConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl ClientConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.retry.policy()?;

        if self.cache.ttl_secs == 0 {
            return Err(ConfigError::ZeroCacheTtl);
        }
        if self.http_timeout_secs == 0 {
            return Err(ConfigError::ZeroHttpTimeout);
        }
        if self.user_agent.trim().is_empty() {
            return Err(ConfigError::EmptyUserAgent);
        }
        Ok(())
    }
}
