use std::time::Duration;

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::classify::{classify_error, flatten_headers};
use crate::error::{ApiError, BODY_READ_ERROR, NO_BODY};
use crate::models::{GitHubRepo, GitHubSearchResponse};
use crate::retry::{with_retry, RetryConfig};

const GITHUB_API_BASE: &str = "https://api.github.com";
const USER_AGENT: &str = "gitscore/0.1.0";

// Hard ceilings so a misconfigured timeout cannot park a request forever.
const CONNECT_TIMEOUT_CEILING_MS: u64 = 1500;
const READ_TIMEOUT_CEILING_MS: u64 = 3000;

/// Wire-level client settings, derived from the boot configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub connect_timeout_ms: u64,
    pub read_timeout_ms: u64,
    /// When true, exhausted retries on transient failures yield a
    /// degraded-empty result instead of an error.
    pub fallback_to_empty: bool,
    pub retry: RetryConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: GITHUB_API_BASE.to_string(),
            connect_timeout_ms: 1000,
            read_timeout_ms: 2500,
            fallback_to_empty: true,
            retry: RetryConfig::default(),
        }
    }
}

/// Parameters for a single search-page fetch.
///
/// `sort`/`order` are `None` when the caller wants to order locally (by
/// score); GitHub then applies its own default ordering over the match set.
#[derive(Debug, Clone)]
pub struct SearchParams {
    pub query: String,
    pub language: Option<String>,
    pub created_after: Option<NaiveDate>,
    pub sort: Option<String>,
    pub order: Option<String>,
    pub page: u32,
    pub per_page: u32,
}

/// Result of a search call, tagged so "upstream was down" is never mistaken
/// for "no matches".
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub total_count: u64,
    pub incomplete_results: bool,
    pub items: Vec<GitHubRepo>,
    pub degraded: bool,
}

impl SearchOutcome {
    fn from_response(response: GitHubSearchResponse) -> Self {
        Self {
            total_count: response.total_count,
            incomplete_results: response.incomplete_results,
            items: response.items,
            degraded: false,
        }
    }

    fn degraded() -> Self {
        Self {
            total_count: 0,
            incomplete_results: false,
            items: Vec::new(),
            degraded: true,
        }
    }
}

/// GitHub repository search client with bounded timeouts and retries.
pub struct GitHubClient {
    client: reqwest::Client,
    base_url: String,
    retry: RetryConfig,
    fallback_to_empty: bool,
}

impl GitHubClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(clamp_timeout(
                config.connect_timeout_ms,
                CONNECT_TIMEOUT_CEILING_MS,
            ))
            .timeout(clamp_timeout(config.read_timeout_ms, READ_TIMEOUT_CEILING_MS))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            retry: config.retry.clone(),
            fallback_to_empty: config.fallback_to_empty,
        })
    }

    /// Fetch one page of search results.
    ///
    /// Transient failures retry per the configured policy; when they keep
    /// failing and fallback is enabled the caller gets a degraded-empty
    /// outcome. Rate limits and other client errors propagate untouched.
    pub async fn search_repositories(
        &self,
        params: &SearchParams,
    ) -> Result<SearchOutcome, ApiError> {
        let result = with_retry(&self.retry, || self.search_once(params)).await;

        match result {
            Ok(response) => {
                info!(
                    "GitHub search returned {} of {} matching repositories",
                    response.items.len(),
                    response.total_count
                );
                Ok(SearchOutcome::from_response(response))
            }
            Err(err) if err.is_retryable() && self.fallback_to_empty => {
                warn!(
                    "GitHub search unavailable after retries, returning degraded empty result: {}",
                    err
                );
                Ok(SearchOutcome::degraded())
            }
            Err(err) => Err(err),
        }
    }

    async fn search_once(&self, params: &SearchParams) -> Result<GitHubSearchResponse, ApiError> {
        let url = format!("{}/search/repositories", self.base_url);
        let query = build_query_pairs(params);

        let response = self.client.get(&url).query(&query).send().await?;
        let status = response.status().as_u16();
        let final_url = response.url().to_string();

        if status >= 400 {
            let headers = flatten_headers(response.headers());
            let body = match response.text().await {
                Ok(body) if body.is_empty() => NO_BODY.to_string(),
                Ok(body) => body,
                Err(err) => {
                    warn!("failed to read error response body: {}", err);
                    BODY_READ_ERROR.to_string()
                }
            };

            return match classify_error(status, &final_url, &body, &headers) {
                Some(err) => Err(err),
                // status >= 400 always classifies; keep the generic shape anyway
                None => Err(ApiError::UpstreamApi {
                    status,
                    url: final_url,
                    body,
                    headers,
                }),
            };
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

/// Query-string pairs for the search endpoint. `sort` and `order` are only
/// sent when upstream-native ordering is wanted; `page`/`per_page` always go.
fn build_query_pairs(params: &SearchParams) -> Vec<(&'static str, String)> {
    let mut pairs = vec![(
        "q",
        compose_query(
            &params.query,
            params.language.as_deref(),
            params.created_after,
        ),
    )];
    if let Some(sort) = &params.sort {
        pairs.push(("sort", sort.clone()));
    }
    if let Some(order) = &params.order {
        pairs.push(("order", order.clone()));
    }
    pairs.push(("page", params.page.to_string()));
    pairs.push(("per_page", params.per_page.to_string()));
    pairs
}

/// GitHub search expression: free-text term, then the `language:` and
/// `created:>` qualifiers, in that fixed order, space separated.
pub fn compose_query(term: &str, language: Option<&str>, created_after: Option<NaiveDate>) -> String {
    let mut query = term.to_string();
    if let Some(language) = language {
        query.push_str(&format!(" language:{}", language));
    }
    if let Some(date) = created_after {
        query.push_str(&format!(" created:>{}", date));
    }
    query
}

fn clamp_timeout(configured_ms: u64, ceiling_ms: u64) -> Duration {
    Duration::from_millis(configured_ms.min(ceiling_ms))
}
