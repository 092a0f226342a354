use std::collections::HashMap;
use thiserror::Error;

/// Placeholder body when the upstream sent nothing at all.
pub const NO_BODY: &str = "<no response body>";
/// Placeholder body when one existed but could not be read.
pub const BODY_READ_ERROR: &str = "<failed to read response body>";

/// All the ways a GitHub API call can go wrong
///
/// Classification happens once, at the client boundary; everything above
/// this crate only ever sees these kinds, never raw transport failures.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("GitHub API rate limit exceeded (resets at epoch {reset_epoch_secs})")]
    RateLimitExceeded {
        reset_epoch_secs: u64,
        url: String,
        body: String,
        headers: HashMap<String, String>,
    },

    #[error("GitHub API request failed with status {status} for {url}")]
    UpstreamApi {
        status: u16,
        url: String,
        body: String,
        headers: HashMap<String, String>,
    },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("failed to decode search response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    /// Whether another attempt has a chance of succeeding.
    ///
    /// Network-level failures and 5xx responses are transient. Rate limits
    /// and other 4xx responses keep failing until something external
    /// changes, so retrying them immediately is wasted effort.
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Network(_) => true,
            ApiError::UpstreamApi { status, .. } => *status >= 500,
            ApiError::RateLimitExceeded { .. } | ApiError::Decode(_) => false,
        }
    }
}
