use gitscore_api::ApiError;
use thiserror::Error;

/// All the ways things can go wrong in gitscore
///
/// We use thiserror here because it generates the boilerplate for us.
/// Life's too short to manually implement Display and Error traits.
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid parameter '{field}': {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("GitHub API rate limit exceeded, resets at epoch {reset_epoch_secs}")]
    RateLimitExceeded { reset_epoch_secs: u64 },

    #[error("GitHub API error (status {status}) for {url}")]
    UpstreamApi {
        status: u16,
        url: String,
        body: String,
    },

    #[error("network error: {0}")]
    Network(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unexpected error: {0}")]
    Unknown(String),
}

impl Error {
    /// HTTP status the rendering layer maps this error to.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::Validation { .. } => 400,
            Error::RateLimitExceeded { .. } => 429,
            Error::UpstreamApi { .. } | Error::Network(_) => 503,
            Error::Config(_) | Error::Io(_) | Error::Unknown(_) => 500,
        }
    }

    /// Value for the `X-RateLimit-Reset` response header, when applicable.
    pub fn rate_limit_reset(&self) -> Option<u64> {
        match self {
            Error::RateLimitExceeded { reset_epoch_secs } => Some(*reset_epoch_secs),
            _ => None,
        }
    }
}

impl From<ApiError> for Error {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::RateLimitExceeded {
                reset_epoch_secs, ..
            } => Error::RateLimitExceeded { reset_epoch_secs },
            ApiError::UpstreamApi {
                status, url, body, ..
            } => Error::UpstreamApi { status, url, body },
            ApiError::Network(e) => Error::Network(e.to_string()),
            ApiError::Decode(e) => Error::Unknown(format!("response decoding failed: {}", e)),
        }
    }
}
