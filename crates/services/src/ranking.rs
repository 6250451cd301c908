//! # Paginated Fetch Accumulator
//!
//! Reconstructs a filtered ranking the backend cannot produce on its own.
//! Backend chunks are fetched one after another through the page cache, run
//! through the compiled predicate, and accumulated until the requested output
//! page is full or the backend has nothing left.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, trace, warn};

use domains::{
    Clock, FilteredRankingRecord, PageCache, PageKey, RankingError, RankingQuery, Result, SearchBackend,
    SearchRequest, SharedPage, SystemClock,
};

use crate::formatter;
use crate::predicate::{self, CompiledFilter};

/// Sizes and bounds of the accumulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Records per backend chunk.
    pub chunk_size: usize,
    /// Records per output page.
    pub page_size: usize,
    /// Safety bound on chunks fetched for one output page. `None` means the
    /// loop only stops on a full page or backend exhaustion.
    pub max_backend_pages: Option<usize>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            chunk_size: 100,
            page_size: 10,
            max_backend_pages: Some(200),
        }
    }
}

/// One output page plus how it was produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankingPage {
    pub page: usize,
    pub records: Vec<FilteredRankingRecord>,
    /// No later page can hold any record.
    pub exhausted: bool,
    pub backend_pages_fetched: usize,
}

pub struct RankingService {
    backend: Arc<dyn SearchBackend>,
    cache: Arc<dyn PageCache>,
    clock: Arc<dyn Clock>,
    options: PipelineOptions,
}

impl RankingService {
    pub fn new(backend: Arc<dyn SearchBackend>, cache: Arc<dyn PageCache>, options: PipelineOptions) -> Self {
        Self {
            backend,
            cache,
            clock: Arc::new(SystemClock),
            options,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn options(&self) -> PipelineOptions {
        self.options
    }

    /// Ranked records of 1-based `output_page`. A short page marks the end
    /// of the ranking.
    pub async fn fetch_page(&self, query: &RankingQuery, output_page: usize) -> Result<Vec<FilteredRankingRecord>> {
        Ok(self.fetch_page_detailed(query, output_page).await?.records)
    }

    #[tracing::instrument(skip(self, query), fields(order = %query.order))]
    pub async fn fetch_page_detailed(&self, query: &RankingQuery, output_page: usize) -> Result<RankingPage> {
        let page_size = self.options.page_size;
        let chunk_size = self.options.chunk_size;
        let wanted = page_window_end(output_page, page_size)?;
        let skip = wanted - page_size;

        // 1. Resolve "now" and compile once for every chunk of this query
        let filter = predicate::compile(&query.filter_options(), self.clock.now());
        if !filter.predicate.is_satisfiable() {
            debug!("no status class allowed, skipping backend");
            return Ok(RankingPage {
                page: output_page,
                records: Vec::new(),
                exhausted: true,
                backend_pages_fetched: 0,
            });
        }

        // 2. Pull chunks until the page is full or the backend runs dry
        let mut survivors = Vec::new();
        let mut backend_page = 0;
        let backend_done = loop {
            let chunk = self.fetch_chunk(query, &filter, backend_page).await?;
            survivors.extend(chunk.values.iter().filter(|record| filter.predicate.matches(record)).cloned());
            backend_page += 1;

            trace!(
                backend_page,
                received = chunk.values.len(),
                survivors = survivors.len(),
                total = chunk.total_count,
                "chunk filtered"
            );

            let no_more = chunk.values.is_empty() || backend_page.saturating_mul(chunk_size) >= chunk.total_count;
            if survivors.len() >= wanted {
                break no_more;
            }
            if no_more {
                break true;
            }
            if self.options.max_backend_pages.is_some_and(|cap| backend_page >= cap) {
                warn!(backend_page, survivors = survivors.len(), "backend page bound reached");
                break true;
            }
        };

        // 3. Slice and number the requested page
        let end = wanted.min(survivors.len());
        let slice = survivors.get(skip..end).unwrap_or_default();
        let records = formatter::format(query.order, slice, skip);

        debug!(
            backend_pages = backend_page,
            returned = records.len(),
            "ranking page assembled"
        );

        Ok(RankingPage {
            page: output_page,
            records,
            exhausted: backend_done && survivors.len() <= wanted,
            backend_pages_fetched: backend_page,
        })
    }

    async fn fetch_chunk(&self, query: &RankingQuery, filter: &CompiledFilter, backend_page: usize) -> Result<SharedPage> {
        let request = SearchRequest::for_chunk(
            query,
            filter.status_filter,
            &filter.fields,
            self.options.chunk_size,
            backend_page,
        );
        let key = PageKey::new(&request, filter.first_update, backend_page);
        let page = self.cache.get_or_fetch(key, self.backend.search(&request)).await?;
        Ok(page)
    }
}

/// One past the last survivor index of 1-based `output_page`.
pub(crate) fn page_window_end(output_page: usize, page_size: usize) -> Result<usize> {
    if output_page == 0 {
        return Err(RankingError::InvalidPage(output_page));
    }
    output_page
        .checked_mul(page_size)
        .ok_or(RankingError::InvalidPage(output_page))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use domains::{
        BackendError, FixedClock, MockSearchBackend, NoCache, RankingOrder, RawRankingRecord, SearchPage,
        NOVEL_TYPE_SERIAL, NOVEL_TYPE_SHORT,
    };

    /// Record `i` of a synthetic ranking: every third record has 10 episodes,
    /// the rest 50. Points decrease with position.
    fn synthetic(i: usize, total: usize) -> RawRankingRecord {
        RawRankingRecord {
            episodes: Some(if i % 3 == 0 { 10 } else { 50 }),
            novel_type: Some(if i % 2 == 0 { NOVEL_TYPE_SERIAL } else { NOVEL_TYPE_SHORT }),
            end: Some(1),
            daily_point: Some((total - i) as u64),
            weekly_point: Some(1_000_000 + i as u64),
            ..RawRankingRecord::new(format!("N{i:04}AA"))
        }
    }

    fn serving(total: usize) -> impl Fn(&SearchRequest) -> std::result::Result<SearchPage, BackendError> + Send + 'static {
        move |request| {
            let end = (request.start + request.limit).min(total);
            let values = (request.start.min(end)..end).map(|i| synthetic(i, total)).collect();
            Ok(SearchPage { total_count: total, values })
        }
    }

    fn service(backend: MockSearchBackend, options: PipelineOptions) -> RankingService {
        RankingService::new(Arc::new(backend), Arc::new(NoCache), options)
            .with_clock(Arc::new(FixedClock(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap())))
    }

    fn small(max_backend_pages: Option<usize>) -> PipelineOptions {
        PipelineOptions {
            chunk_size: 3,
            page_size: 2,
            max_backend_pages,
        }
    }

    #[tokio::test]
    async fn page_zero_is_rejected() {
        let mut backend = MockSearchBackend::new();
        backend.expect_search().never();
        let err = service(backend, small(None))
            .fetch_page(&RankingQuery::new(RankingOrder::Daily), 0)
            .await
            .unwrap_err();
        assert_eq!(err, RankingError::InvalidPage(0));
    }

    #[tokio::test]
    async fn page_numbers_past_the_addressable_range_are_rejected() {
        let mut backend = MockSearchBackend::new();
        backend.expect_search().never();
        let page = usize::MAX / 5;
        let err = service(backend, PipelineOptions::default())
            .fetch_page(&RankingQuery::new(RankingOrder::Daily), page)
            .await
            .unwrap_err();
        assert_eq!(err, RankingError::InvalidPage(page));
    }

    #[test]
    fn page_window_covers_whole_pages() {
        assert_eq!(page_window_end(1, 10), Ok(10));
        assert_eq!(page_window_end(3, 10), Ok(30));
        assert_eq!(page_window_end(0, 10), Err(RankingError::InvalidPage(0)));
        assert_eq!(page_window_end(usize::MAX, 2), Err(RankingError::InvalidPage(usize::MAX)));
    }

    #[tokio::test]
    async fn exhaustion_stops_after_one_call_whatever_the_selectivity() {
        let mut backend = MockSearchBackend::new();
        backend.expect_search().times(1).returning(serving(25));

        let query = RankingQuery::new(RankingOrder::Daily).with_episode_range(Some(1000), None);
        let options = PipelineOptions { chunk_size: 100, ..PipelineOptions::default() };
        let page = service(backend, options).fetch_page_detailed(&query, 1).await.unwrap();

        assert!(page.records.is_empty());
        assert!(page.exhausted);
        assert_eq!(page.backend_pages_fetched, 1);
    }

    #[tokio::test]
    async fn fetches_lazily_until_the_page_is_full() {
        // Survivors (10 episodes) sit at 0, 3, 6, 9, ... so one per 3-record chunk.
        let mut backend = MockSearchBackend::new();
        backend.expect_search().times(4).returning(serving(1_000));

        let query = RankingQuery::new(RankingOrder::Daily).with_episode_range(None, Some(30));
        let page = service(backend, small(None)).fetch_page_detailed(&query, 2).await.unwrap();

        let ncodes: Vec<&str> = page.records.iter().map(|r| r.ncode.as_str()).collect();
        assert_eq!(ncodes, vec!["N0006AA", "N0009AA"]);
        let ranks: Vec<usize> = page.records.iter().map(|r| r.rank).collect();
        assert_eq!(ranks, vec![3, 4]);
        assert_eq!(page.backend_pages_fetched, 4);
        assert!(!page.exhausted);
    }

    #[tokio::test]
    async fn chunk_requests_are_sequential_offsets() {
        let mut backend = MockSearchBackend::new();
        let mut seq = mockall::Sequence::new();
        for start in [0, 3, 6] {
            backend
                .expect_search()
                .withf(move |request| request.start == start && request.limit == 3)
                .times(1)
                .in_sequence(&mut seq)
                .returning(serving(9));
        }

        let query = RankingQuery::new(RankingOrder::Daily).with_episode_range(None, Some(30));
        let records = service(backend, small(None)).fetch_page(&query, 5).await.unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn short_final_page_is_not_an_error() {
        let mut backend = MockSearchBackend::new();
        backend.expect_search().returning(serving(7));

        let records = service(backend, small(None))
            .fetch_page(&RankingQuery::new(RankingOrder::Daily), 4)
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].rank, 7);
        assert_eq!(records[0].point, 1);
    }

    #[tokio::test]
    async fn safety_bound_caps_pathological_filters() {
        let mut backend = MockSearchBackend::new();
        backend.expect_search().times(5).returning(serving(1_000_000));

        let query = RankingQuery::new(RankingOrder::Daily).with_episode_range(Some(999), None);
        let page = service(backend, small(Some(5))).fetch_page_detailed(&query, 1).await.unwrap();
        assert!(page.records.is_empty());
        assert!(page.exhausted);
        assert_eq!(page.backend_pages_fetched, 5);
    }

    #[tokio::test]
    async fn empty_chunk_ends_the_loop_even_if_total_lies() {
        let mut backend = MockSearchBackend::new();
        backend
            .expect_search()
            .times(1)
            .returning(|_| Ok(SearchPage { total_count: 5_000, values: Vec::new() }));

        let page = service(backend, small(None))
            .fetch_page_detailed(&RankingQuery::new(RankingOrder::Weekly), 1)
            .await
            .unwrap();
        assert!(page.records.is_empty());
        assert!(page.exhausted);
    }

    #[tokio::test]
    async fn unsatisfiable_status_filter_never_hits_the_backend() {
        let mut backend = MockSearchBackend::new();
        backend.expect_search().never();

        let query = RankingQuery::new(RankingOrder::Daily).with_statuses(false, false, false);
        let page = service(backend, small(None)).fetch_page_detailed(&query, 1).await.unwrap();
        assert!(page.records.is_empty());
        assert_eq!(page.backend_pages_fetched, 0);
    }

    #[tokio::test]
    async fn backend_errors_bubble_unmodified() {
        let mut backend = MockSearchBackend::new();
        backend
            .expect_search()
            .times(1)
            .returning(|_| Err(BackendError::Status { status: 502, body: "bad gateway".into() }));

        let err = service(backend, small(None))
            .fetch_page(&RankingQuery::new(RankingOrder::Daily), 1)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            RankingError::Backend(BackendError::Status { status: 502, body: "bad gateway".into() })
        );
    }

    #[tokio::test]
    async fn requests_only_the_fields_the_filter_needs() {
        use domains::{Field, FieldSet, StatusFilter};

        let mut backend = MockSearchBackend::new();
        backend
            .expect_search()
            .withf(|request| {
                request.fields == FieldSet::from([Field::Ncode, Field::WeeklyPoint])
                    && request.status_filter == StatusFilter::All
            })
            .times(1)
            .returning(serving(2));

        let records = service(backend, small(None))
            .fetch_page(&RankingQuery::new(RankingOrder::Weekly), 1)
            .await
            .unwrap();
        assert_eq!(records.iter().map(|r| r.point).collect::<Vec<_>>(), vec![1_000_000, 1_000_001]);
    }
}
