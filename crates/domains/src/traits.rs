//! # Core Traits (Ports)
//!
//! Any backend adapter must implement these traits to feed the pipeline.
//! Mocks are generated for tests behind the `testing` feature.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use futures::future::BoxFuture;

use crate::error::BackendError;
use crate::models::{ItemMetadata, NativeRankingEntry, PeriodKind, RankingHistoryEntry};
use crate::search::{PageKey, SearchPage, SearchRequest, SharedPage};

/// Paginated search endpoint of the external service.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Returns one chunk of records sorted by the request's order.
    async fn search(&self, request: &SearchRequest) -> Result<SearchPage, BackendError>;
}

/// Bulk metadata lookup by identifier.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait MetadataBackend: Send + Sync {
    /// Unknown identifiers are simply absent from the result.
    async fn fetch_metadata(&self, ncodes: &[String]) -> Result<Vec<ItemMetadata>, BackendError>;
}

/// Past ranking appearances of a single work.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait RankingHistoryBackend: Send + Sync {
    async fn fetch_history(&self, ncode: &str) -> Result<Vec<RankingHistoryEntry>, BackendError>;
}

/// Published snapshot rankings.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait NativeRankingBackend: Send + Sync {
    /// `date` must already be normalised to the period's publication day.
    async fn fetch_ranking(
        &self,
        period: PeriodKind,
        date: NaiveDate,
    ) -> Result<Vec<NativeRankingEntry>, BackendError>;
}

/// Lazily evaluated backend fetch handed to a [`PageCache`].
pub type PageFetch<'a> = BoxFuture<'a, Result<SearchPage, BackendError>>;

/// Memoizes backend chunks.
///
/// `fetch` is only polled on a miss. Implementations must deduplicate
/// concurrent misses for the same key (one fetch per key) and must not
/// cache failures.
#[async_trait]
pub trait PageCache: Send + Sync {
    async fn get_or_fetch(&self, key: PageKey, fetch: PageFetch<'_>) -> Result<SharedPage, BackendError>;

    fn evict(&self, key: &PageKey);

    fn clear(&self);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A pass-through cache that always fetches.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCache;

#[async_trait]
impl PageCache for NoCache {
    async fn get_or_fetch(&self, _key: PageKey, fetch: PageFetch<'_>) -> Result<SharedPage, BackendError> {
        fetch.await.map(SharedPage::new)
    }

    fn evict(&self, _key: &PageKey) {}

    fn clear(&self) {}

    fn len(&self) -> usize {
        0
    }
}

/// Source of "now", injectable for tests.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RankingOrder, RankingQuery, RawRankingRecord};
    use crate::search::StatusFilter;

    #[tokio::test]
    async fn no_cache_always_fetches() {
        let query = RankingQuery::new(RankingOrder::Daily);
        let request = SearchRequest::for_chunk(&query, StatusFilter::All, &Default::default(), 10, 0);
        let key = PageKey::new(&request, None, 0);

        let mut backend = MockSearchBackend::new();
        backend.expect_search().times(2).returning(|_| {
            Ok(SearchPage { total_count: 1, values: vec![RawRankingRecord::new("N0001AA")] })
        });

        let cache = NoCache;
        for _ in 0..2 {
            let page = cache
                .get_or_fetch(key.clone(), Box::pin(backend.search(&request)))
                .await
                .unwrap();
            assert_eq!(page.total_count, 1);
        }
        assert!(cache.is_empty());
    }
}
