use crate::endpoints::Upstreams;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use upstream::{ClientConfig, ConfigError};

#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("Port cannot be 0")]
    InvalidPort,

    #[error("Build timeout cannot be 0")]
    ZeroBuildTimeout,

    #[error("Invalid client settings: {0}")]
    Client(#[from] ConfigError),

    #[error("Upstream base url is not usable: {0}")]
    InvalidUpstream(String),
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Public API listener
    pub listener: Listener,
    /// Health and readiness probes
    pub admin_listener: Listener,
    /// Upper bound on building one artist record. Unbounded when absent.
    pub build_timeout_secs: Option<u64>,
    pub client: ClientConfig,
    pub upstreams: Upstreams,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            listener: Listener::new("127.0.0.1", 3000),
            admin_listener: Listener::new("127.0.0.1", 3001),
            build_timeout_secs: None,
            client: ClientConfig::default(),
            upstreams: Upstreams::default(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.listener.validate()?;
        self.admin_listener.validate()?;

        if self.build_timeout_secs == Some(0) {
            return Err(ValidationError::ZeroBuildTimeout);
        }

        self.client.validate()?;

        if let Some(url) = self.upstreams.invalid_bases().first() {
            return Err(ValidationError::InvalidUpstream(url.to_string()));
        }

        Ok(())
    }

    pub fn build_timeout(&self) -> Option<Duration> {
        self.build_timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Listener {
    /// Host address to bind to (e.g., "0.0.0.0" or "127.0.0.1")
    pub host: String,
    /// Port number to listen on
    pub port: u16,
}

impl Listener {
    pub fn new(host: &str, port: u16) -> Self {
        Listener {
            host: host.to_string(),
            port,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        Ok(())
    }
}
