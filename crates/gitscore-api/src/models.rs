use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One page of results from `GET /search/repositories`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubSearchResponse {
    pub total_count: u64,
    #[serde(default)]
    pub incomplete_results: bool,
    pub items: Vec<GitHubRepo>,
}

/// A repository as GitHub's search API returns it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubRepo {
    pub id: i64,
    pub name: String,
    pub full_name: String,
    pub html_url: String,
    pub description: Option<String>,
    pub language: Option<String>,
    #[serde(default)]
    pub forks_count: u64,
    #[serde(default, rename = "stargazers_count")]
    pub stars: u64,
    pub updated_at: DateTime<Utc>,
}
