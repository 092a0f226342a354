// Provider seam between orchestration and the GitHub client
use async_trait::async_trait;
use gitscore_api::{ClientConfig, GitHubClient, GitHubRepo, SearchParams};

use crate::{
    models::{QueryKey, Repository},
    Result,
};

/// A fetched page of repositories, tagged when it came from the degraded
/// fallback rather than a real upstream response.
#[derive(Debug, Clone)]
pub struct SearchResults {
    pub repositories: Vec<Repository>,
    pub degraded: bool,
}

/// Trait for the upstream fetch - makes testing easier and keeps things flexible
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn fetch_page(&self, key: &QueryKey) -> Result<SearchResults>;
}

/// Wrapper around GitHubClient that implements SearchProvider
pub struct GitHubProvider {
    client: GitHubClient,
}

impl GitHubProvider {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = GitHubClient::new(config)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl SearchProvider for GitHubProvider {
    async fn fetch_page(&self, key: &QueryKey) -> Result<SearchResults> {
        let (sort, order) = upstream_sort(key);
        let params = SearchParams {
            query: key.search_term.clone(),
            language: key.language.clone(),
            created_after: key.created_after,
            sort,
            order,
            page: key.page,
            per_page: key.per_page,
        };

        let outcome = self.client.search_repositories(&params).await?;

        Ok(SearchResults {
            repositories: outcome.items.into_iter().map(api_to_repo).collect(),
            degraded: outcome.degraded,
        })
    }
}

/// Score ordering is computed locally, so upstream gets no sort hints for
/// it and applies its own default order. Everything else is delegated.
fn upstream_sort(key: &QueryKey) -> (Option<String>, Option<String>) {
    if key.wants_score_sort() {
        (None, None)
    } else {
        (Some(key.sort_by.clone()), Some(key.sort_order.clone()))
    }
}

/// Convert the wire representation into our domain model
fn api_to_repo(gh: GitHubRepo) -> Repository {
    Repository {
        id: gh.id,
        name: gh.name,
        url: gh.html_url,
        stars: gh.stars,
        forks: gh.forks_count,
        language: gh.language,
        last_updated: gh.updated_at,
    }
}
