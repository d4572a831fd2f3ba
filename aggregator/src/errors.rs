use thiserror::Error;
use upstream::ClientError;

/// Why no artist record could be built. Only the primary lookup can fail a
/// build; every dependent lookup degrades to an empty field instead.
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("artist not found: {0}")]
    NotFound(String),

    #[error("artist lookup failed: {0}")]
    Upstream(#[from] ClientError),

    #[error("artist document could not be parsed: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Failure of a single dependent lookup. Logged and counted, then replaced
/// by an empty value.
#[derive(Error, Debug)]
pub(crate) enum LookupError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("unexpected response body: {0}")]
    Parse(#[from] serde_json::Error),
}

impl LookupError {
    pub(crate) fn reason(&self) -> &'static str {
        match self {
            LookupError::Client(ClientError::NotFound) => "not_found",
            LookupError::Client(ClientError::RetryLimitExceeded { .. }) => "retries_exhausted",
            LookupError::Client(ClientError::Transport(_)) => "transport",
            LookupError::Parse(_) => "parse",
        }
    }
}
