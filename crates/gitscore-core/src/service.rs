// Orchestration: cache -> fetch -> score -> order
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use gitscore_cache::QueryCache;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::{
    models::{QueryKey, Repository, RepositoryResponse, ScoredRepository, SearchRequest, SortBy, SortOrder},
    provider::SearchProvider,
    scoring::ScoreCalculator,
    Result,
};

/// Scored search results, tagged when the upstream was unavailable so an
/// empty degraded page is never mistaken for a zero-match search.
#[derive(Debug, Clone)]
pub struct ScoredSearch {
    pub repositories: Vec<ScoredRepository>,
    pub degraded: bool,
}

impl ScoredSearch {
    /// Rendering-layer shape with percentage scores.
    pub fn to_responses(&self) -> Vec<RepositoryResponse> {
        self.repositories.iter().map(RepositoryResponse::from).collect()
    }
}

/// Coordinates the fetch-score-order pipeline for one request at a time.
///
/// Only raw repository pages are cached; scores are recomputed on every
/// request so a scoring config change needs no cache invalidation.
pub struct ScoringService {
    provider: Arc<dyn SearchProvider>,
    calculator: Box<dyn ScoreCalculator>,
    cache: QueryCache<QueryKey, Vec<Repository>>,
    inflight: Mutex<HashMap<QueryKey, Arc<Mutex<()>>>>,
}

impl ScoringService {
    pub fn new(
        provider: Arc<dyn SearchProvider>,
        calculator: Box<dyn ScoreCalculator>,
        cache_ttl: Duration,
        cache_capacity: usize,
    ) -> Self {
        Self {
            provider,
            calculator,
            cache: QueryCache::new(cache_ttl, cache_capacity),
            inflight: Mutex::new(HashMap::new()),
        }
    }

    /// Fetch, score and order one page of repositories.
    ///
    /// Sorting by stars or forks is delegated upstream; only the score sort
    /// is applied locally, and it reorders the fetched page, not GitHub's
    /// full result set.
    pub async fn search(&self, request: &SearchRequest) -> Result<ScoredSearch> {
        request.validate()?;
        let key = QueryKey::from(request);

        if let Some(repositories) = self.cache.get(&key) {
            debug!("cache hit for '{}', skipping upstream call", key.search_term);
            return Ok(self.score_and_order(repositories, request, false));
        }

        let (repositories, degraded) = self.fetch_coalesced(&key).await?;
        Ok(self.score_and_order(repositories, request, degraded))
    }

    /// At most one upstream call per identical query key; concurrent
    /// requests for the same key wait and then re-read the cache.
    async fn fetch_coalesced(&self, key: &QueryKey) -> Result<(Vec<Repository>, bool)> {
        let gate = {
            let mut inflight = self.inflight.lock().await;
            inflight
                .entry(key.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        let _permit = gate.lock().await;

        // another request may have fetched while we waited on the gate
        if let Some(repositories) = self.cache.get(key) {
            debug!("coalesced into an earlier fetch for '{}'", key.search_term);
            return Ok((repositories, false));
        }

        let outcome = self.provider.fetch_page(key).await;

        match &outcome {
            Ok(results) if results.degraded => {
                warn!(
                    "upstream unavailable for '{}', serving degraded empty result (not cached)",
                    key.search_term
                );
            }
            Ok(results) => {
                self.cache.put(key.clone(), results.repositories.clone());
                info!(
                    "fetched {} repositories for '{}'",
                    results.repositories.len(),
                    key.search_term
                );
            }
            Err(_) => {}
        }

        // the cache is populated before the gate entry goes away, so a fresh
        // request can never open a new gate and refetch the same page;
        // waiters still hold their clone of the old gate
        self.inflight.lock().await.remove(key);

        let results = outcome?;
        Ok((results.repositories, results.degraded))
    }

    fn score_and_order(
        &self,
        repositories: Vec<Repository>,
        request: &SearchRequest,
        degraded: bool,
    ) -> ScoredSearch {
        let mut scored: Vec<ScoredRepository> = repositories
            .into_iter()
            .map(|repository| {
                let score = self.calculator.popularity_score(&repository);
                ScoredRepository::new(repository, score)
            })
            .collect();

        if request.sort_by == SortBy::Score {
            // stable sort: equal scores keep their upstream arrival order
            match request.sort_order {
                SortOrder::Asc => scored.sort_by(|a, b| a.score.total_cmp(&b.score)),
                SortOrder::Desc => scored.sort_by(|a, b| b.score.total_cmp(&a.score)),
            }
        }

        ScoredSearch {
            repositories: scored,
            degraded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{MockSearchProvider, SearchResults};
    use chrono::Utc;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Deterministic calculator: the star count is the score.
    struct StarScore;

    impl ScoreCalculator for StarScore {
        fn popularity_score(&self, repository: &Repository) -> f32 {
            repository.stars as f32
        }
    }

    fn repo(name: &str, stars: u64) -> Repository {
        Repository {
            id: stars as i64,
            name: name.into(),
            url: format!("https://github.com/octocat/{}", name),
            stars,
            forks: 0,
            language: None,
            last_updated: Utc::now(),
        }
    }

    fn page(repositories: Vec<Repository>) -> SearchResults {
        SearchResults {
            repositories,
            degraded: false,
        }
    }

    fn degraded_page() -> SearchResults {
        SearchResults {
            repositories: Vec::new(),
            degraded: true,
        }
    }

    fn service(provider: MockSearchProvider) -> ScoringService {
        ScoringService::new(
            Arc::new(provider),
            Box::new(StarScore),
            Duration::from_secs(60),
            16,
        )
    }

    fn score_request(order: SortOrder) -> SearchRequest {
        let mut request = SearchRequest::new("rust");
        request.sort_by = SortBy::Score;
        request.sort_order = order;
        request
    }

    #[tokio::test]
    async fn score_sort_desc_orders_by_score() {
        let mut provider = MockSearchProvider::new();
        provider
            .expect_fetch_page()
            .returning(|_| Ok(page(vec![repo("a", 75), repo("b", 95), repo("c", 50)])));

        let results = service(provider)
            .search(&score_request(SortOrder::Desc))
            .await
            .unwrap();

        let names: Vec<&str> = results.repositories.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a", "c"]);
    }

    #[tokio::test]
    async fn score_sort_asc_orders_by_score() {
        let mut provider = MockSearchProvider::new();
        provider
            .expect_fetch_page()
            .returning(|_| Ok(page(vec![repo("a", 75), repo("b", 95), repo("c", 50)])));

        let results = service(provider)
            .search(&score_request(SortOrder::Asc))
            .await
            .unwrap();

        let names: Vec<&str> = results.repositories.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["c", "a", "b"]);
    }

    #[tokio::test]
    async fn equal_scores_keep_arrival_order() {
        let mut provider = MockSearchProvider::new();
        provider.expect_fetch_page().returning(|_| {
            Ok(page(vec![
                repo("first", 50),
                repo("second", 50),
                repo("third", 50),
            ]))
        });

        let results = service(provider)
            .search(&score_request(SortOrder::Desc))
            .await
            .unwrap();

        let names: Vec<&str> = results.repositories.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn native_sorts_trust_upstream_order() {
        let mut provider = MockSearchProvider::new();
        provider
            .expect_fetch_page()
            .returning(|_| Ok(page(vec![repo("a", 10), repo("b", 99), repo("c", 40)])));

        // stars sort: upstream already ordered the page, we leave it alone
        let results = service(provider)
            .search(&SearchRequest::new("rust"))
            .await
            .unwrap();

        let names: Vec<&str> = results.repositories.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn cache_hit_skips_the_upstream_call() {
        let mut provider = MockSearchProvider::new();
        provider
            .expect_fetch_page()
            .times(1)
            .returning(|_| Ok(page(vec![repo("a", 75)])));

        let service = service(provider);
        let request = SearchRequest::new("rust");

        let first = service.search(&request).await.unwrap();
        let second = service.search(&request).await.unwrap();

        assert_eq!(first.repositories, second.repositories);
        // scores are recomputed from raw data on the hit path
        assert_eq!(second.repositories[0].score, 75.0);
    }

    #[tokio::test]
    async fn degraded_results_are_tagged_and_never_cached() {
        let mut provider = MockSearchProvider::new();
        provider
            .expect_fetch_page()
            .times(2)
            .returning(|_| Ok(degraded_page()));

        let service = service(provider);
        let request = SearchRequest::new("rust");

        let first = service.search(&request).await.unwrap();
        assert!(first.degraded);
        assert!(first.repositories.is_empty());

        // a degraded page must not poison the cache; the next request refetches
        let second = service.search(&request).await.unwrap();
        assert!(second.degraded);
    }

    #[tokio::test]
    async fn genuinely_empty_results_are_not_degraded() {
        let mut provider = MockSearchProvider::new();
        provider.expect_fetch_page().returning(|_| Ok(page(Vec::new())));

        let results = service(provider)
            .search(&SearchRequest::new("rust"))
            .await
            .unwrap();

        assert!(!results.degraded);
        assert!(results.repositories.is_empty());
    }

    #[tokio::test]
    async fn classified_errors_propagate_unchanged() {
        let mut provider = MockSearchProvider::new();
        provider.expect_fetch_page().returning(|_| {
            Err(crate::Error::RateLimitExceeded {
                reset_epoch_secs: 1234567890,
            })
        });

        let err = service(provider)
            .search(&SearchRequest::new("rust"))
            .await
            .unwrap_err();

        assert_eq!(err.http_status(), 429);
        assert_eq!(err.rate_limit_reset(), Some(1234567890));
    }

    #[tokio::test]
    async fn invalid_requests_never_reach_the_provider() {
        let mut provider = MockSearchProvider::new();
        provider.expect_fetch_page().never();

        let err = service(provider)
            .search(&SearchRequest::new("   "))
            .await
            .unwrap_err();

        assert_eq!(err.http_status(), 400);
    }

    #[tokio::test]
    async fn score_sort_reorders_only_the_fetched_page() {
        // Documented behavior: scoring happens after one page is fetched, so
        // a score sort ranks within that page, not across the full set of
        // matches upstream holds.
        let mut provider = MockSearchProvider::new();
        provider
            .expect_fetch_page()
            .returning(|_| Ok(page(vec![repo("a", 10), repo("b", 30)])));

        let results = service(provider)
            .search(&score_request(SortOrder::Desc))
            .await
            .unwrap();

        // only the two fetched repositories are ranked
        assert_eq!(results.repositories.len(), 2);
        assert_eq!(results.repositories[0].name, "b");
    }

    /// Provider that counts invocations and takes long enough to answer that
    /// concurrent requests pile up behind the first one.
    struct SlowCountingProvider {
        calls: Arc<AtomicU32>,
    }

    #[async_trait::async_trait]
    impl SearchProvider for SlowCountingProvider {
        async fn fetch_page(&self, _key: &QueryKey) -> crate::Result<SearchResults> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(100)).await;
            Ok(page(vec![repo("a", 75)]))
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_identical_queries_share_one_upstream_call() {
        let calls = Arc::new(AtomicU32::new(0));
        let provider = SlowCountingProvider {
            calls: calls.clone(),
        };
        let service = Arc::new(ScoringService::new(
            Arc::new(provider),
            Box::new(StarScore),
            Duration::from_secs(60),
            16,
        ));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let service = service.clone();
            handles.push(tokio::spawn(async move {
                service.search(&SearchRequest::new("rust")).await.unwrap()
            }));
        }

        for handle in handles {
            let results = handle.await.unwrap();
            assert_eq!(results.repositories.len(), 1);
            assert!(!results.degraded);
        }

        // everyone coalesced into a single in-flight fetch for the key
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn renders_percentage_scores_for_the_response_shape() {
        let mut provider = MockSearchProvider::new();
        provider
            .expect_fetch_page()
            .returning(|_| Ok(page(vec![repo("a", 1)])));

        let results = service(provider)
            .search(&SearchRequest::new("rust"))
            .await
            .unwrap();

        let responses = results.to_responses();
        assert_eq!(responses[0].score, "100%");
    }
}
