// Response cache keyed by request URL. Entries expire a fixed time after they
// were written; an expired entry reads exactly like a missing one.
use crate::config::CacheConfig;
use crate::metrics_defs::{CACHE_HIT, CACHE_MISS};
use moka::future::Cache;
use shared::counter;
use std::future::Future;
use std::time::Duration;

#[derive(Clone)]
pub struct ResponseCache {
    cache: Cache<String, String>,
    single_flight: bool,
}

impl ResponseCache {
    pub fn new(ttl: Duration, max_capacity: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(ttl)
            .build();

        ResponseCache {
            cache,
            single_flight: false,
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(Duration::from_secs(config.ttl_secs), config.max_capacity)
            .with_single_flight(config.single_flight)
    }

    /// When enabled, concurrent misses on one key wait for a single supplier
    /// run and share its result. Off by default: racing misses each run
    /// their own supplier and the last write wins.
    pub fn with_single_flight(mut self, enabled: bool) -> Self {
        self.single_flight = enabled;
        self
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        self.cache.get(key).await
    }

    pub async fn insert(&self, key: &str, value: String) {
        self.cache.insert(key.to_owned(), value).await;
    }

    /// Returns the live value for `key`, or runs `supplier` and caches its
    /// `Ok` value. Errors are returned to the caller and never cached.
    pub async fn get_or_try_compute<F, Fut, E>(&self, key: &str, supplier: F) -> Result<String, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, E>>,
        E: Clone + Send + Sync + 'static,
    {
        if let Some(value) = self.cache.get(key).await {
            counter!(CACHE_HIT).increment(1);
            return Ok(value);
        }
        counter!(CACHE_MISS).increment(1);

        if self.single_flight {
            return self
                .cache
                .try_get_with(key.to_owned(), supplier())
                .await
                .map_err(|e| (*e).clone());
        }

        let value = supplier().await?;
        self.cache.insert(key.to_owned(), value.clone()).await;
        Ok(value)
    }
}
