// GitHub search API client - request building, retries, error classification
pub mod classify;
pub mod error;
pub mod github;
pub mod models;
pub mod retry;

// Re-export common types
pub use classify::{classify_error, flatten_headers};
pub use error::ApiError;
pub use github::{ClientConfig, GitHubClient, SearchOutcome, SearchParams};
pub use models::{GitHubRepo, GitHubSearchResponse};
pub use retry::RetryConfig;
