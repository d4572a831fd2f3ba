//! Resilient access to public HTTP upstreams: a TTL response cache in front of
//! a GET client that retries transient failures with capped exponential
//! backoff.

pub mod backoff;
pub mod cache;
pub mod client;
pub mod config;
pub mod metrics_defs;

pub use backoff::{BackoffError, BackoffPolicy};
pub use cache::ResponseCache;
pub use client::{ClientError, ResilientClient, SetupError};
pub use config::{CacheConfig, ClientConfig, ConfigError, RetryConfig};
