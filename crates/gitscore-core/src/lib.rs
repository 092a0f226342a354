// Core business logic lives here - the brain of the operation
pub mod config;
pub mod error;
pub mod models;
pub mod provider;
pub mod scoring;
pub mod service;

pub use config::Config;
pub use error::Error;
pub use models::{
    QueryKey, Repository, RepositoryResponse, ScoredRepository, SearchRequest, SortBy, SortOrder,
};
pub use provider::{GitHubProvider, SearchProvider, SearchResults};
pub use scoring::{ScoreCalculator, ScoringConfig, WeightedScoreCalculator};
pub use service::{ScoredSearch, ScoringService};

/// Result type alias because typing Result<T, Error> everywhere is tedious
pub type Result<T> = std::result::Result<T, Error>;
