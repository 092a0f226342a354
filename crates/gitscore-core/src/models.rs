use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Repository model - the star of the show
///
/// Decoded from one upstream search item, never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repository {
    pub id: i64,
    pub name: String,
    pub url: String,
    pub stars: u64,
    pub forks: u64,
    pub language: Option<String>,
    pub last_updated: DateTime<Utc>,
}

/// Repository plus its computed popularity score.
///
/// Derived once per request; scores are never cached so config changes take
/// effect without invalidation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredRepository {
    pub id: i64,
    pub name: String,
    pub url: String,
    pub stars: u64,
    pub forks: u64,
    pub language: Option<String>,
    pub last_updated: DateTime<Utc>,
    pub score: f32,
}

impl ScoredRepository {
    pub fn new(repository: Repository, score: f32) -> Self {
        Self {
            id: repository.id,
            name: repository.name,
            url: repository.url,
            stars: repository.stars,
            forks: repository.forks,
            language: repository.language,
            last_updated: repository.last_updated,
            score,
        }
    }
}

/// Sort fields accepted by the search surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    #[default]
    Stars,
    Forks,
    Score,
}

impl SortBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortBy::Stars => "stars",
            SortBy::Forks => "forks",
            SortBy::Score => "score",
        }
    }
}

impl FromStr for SortBy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stars" => Ok(SortBy::Stars),
            "forks" => Ok(SortBy::Forks),
            "score" => Ok(SortBy::Score),
            _ => Err(Error::Validation {
                field: "sortBy",
                reason: format!("unknown sort field '{}', expected stars, forks or score", s),
            }),
        }
    }
}

/// Requested result ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

impl FromStr for SortOrder {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            _ => Err(Error::Validation {
                field: "sortOrder",
                reason: format!("unknown sort order '{}', expected asc or desc", s),
            }),
        }
    }
}

/// Inbound search parameters with the documented defaults.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub search_query: String,
    pub language: Option<String>,
    pub sort_by: SortBy,
    pub sort_order: SortOrder,
    pub page_number: u32,
    pub page_size: u32,
    pub created_after: Option<NaiveDate>,
}

impl SearchRequest {
    pub fn new(search_query: impl Into<String>) -> Self {
        Self {
            search_query: search_query.into(),
            language: None,
            sort_by: SortBy::default(),
            sort_order: SortOrder::default(),
            page_number: 1,
            page_size: 10,
            created_after: None,
        }
    }

    /// Rejects parameters the upstream contract would refuse.
    pub fn validate(&self) -> Result<()> {
        if self.search_query.trim().is_empty() {
            return Err(Error::Validation {
                field: "searchQuery",
                reason: "must not be blank".into(),
            });
        }
        if self.page_number < 1 {
            return Err(Error::Validation {
                field: "pageNumber",
                reason: "must be at least 1".into(),
            });
        }
        if self.page_size < 1 || self.page_size > 100 {
            return Err(Error::Validation {
                field: "pageSize",
                reason: "must be between 1 and 100".into(),
            });
        }
        Ok(())
    }
}

/// Normalized identity of one search.
///
/// Doubles as the cache key and as the basis of the upstream query string;
/// two requests with identical normalized fields share a cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    pub search_term: String,
    pub language: Option<String>,
    pub sort_by: String,
    pub sort_order: String,
    pub page: u32,
    pub per_page: u32,
    pub created_after: Option<NaiveDate>,
}

impl From<&SearchRequest> for QueryKey {
    fn from(request: &SearchRequest) -> Self {
        // as_str() yields the lower-cased canonical spelling
        Self {
            search_term: request.search_query.clone(),
            language: request.language.clone(),
            sort_by: request.sort_by.as_str().to_string(),
            sort_order: request.sort_order.as_str().to_string(),
            page: request.page_number,
            per_page: request.page_size,
            created_after: request.created_after,
        }
    }
}

impl QueryKey {
    pub fn wants_score_sort(&self) -> bool {
        self.sort_by == "score"
    }
}

/// Shape handed to the rendering layer; the score becomes a percentage.
#[derive(Debug, Clone, Serialize)]
pub struct RepositoryResponse {
    pub id: i64,
    pub name: String,
    pub url: String,
    pub language: Option<String>,
    pub stars: u64,
    pub forks: u64,
    pub last_updated: DateTime<Utc>,
    pub score: String,
}

impl From<&ScoredRepository> for RepositoryResponse {
    fn from(repository: &ScoredRepository) -> Self {
        Self {
            id: repository.id,
            name: repository.name.clone(),
            url: repository.url.clone(),
            language: repository.language.clone(),
            stars: repository.stars,
            forks: repository.forks,
            last_updated: repository.last_updated,
            score: format_score(repository.score),
        }
    }
}

/// `0.955` renders as `"96%"`. No clamping: unnormalized scores can exceed
/// 100%.
pub fn format_score(score: f32) -> String {
    format!("{}%", (score * 100.0).round() as i64)
}
