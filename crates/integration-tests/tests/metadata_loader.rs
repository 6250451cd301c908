//! Batched metadata lookups feeding off a ranking page.

use std::sync::Arc;

use domains::{FixedClock, RankingOrder, RankingQuery};
use futures::future::join_all;
use integration_tests::{catalogue, fixed_now, title_of, FakeMetadata, FakeSearch};
use services::{LoaderOptions, MetadataLoader, PipelineOptions, RankingService};
use storage_adapters::{CacheOptions, InMemoryPageCache};

#[tokio::test]
async fn enriching_a_page_costs_one_lookup() {
    let works = catalogue(300);
    let search = Arc::new(FakeSearch::new(works.clone()));
    let metadata = Arc::new(FakeMetadata::for_catalogue(&works));

    let ranking = RankingService::new(
        search,
        Arc::new(InMemoryPageCache::new(CacheOptions::default())),
        PipelineOptions { page_size: 50, ..PipelineOptions::default() },
    )
    .with_clock(Arc::new(FixedClock(fixed_now())));
    let loader = MetadataLoader::new(metadata.clone(), LoaderOptions::default());

    let records = ranking.fetch_page(&RankingQuery::new(RankingOrder::Daily), 1).await.unwrap();
    assert_eq!(records.len(), 50);

    let lookups = join_all(records.iter().map(|record| loader.load(&record.ncode))).await;
    for (record, found) in records.iter().zip(lookups) {
        let item = found.unwrap().expect("every ranked work is known");
        assert_eq!(item.ncode, record.ncode);
        assert_eq!(item.title, title_of(&record.ncode));
    }
    assert_eq!(metadata.calls().len(), 1);
    assert_eq!(metadata.calls()[0].len(), 50);
}

#[tokio::test]
async fn oversized_rounds_split_at_the_batch_cap() {
    let works = catalogue(600);
    let metadata = Arc::new(FakeMetadata::for_catalogue(&works));
    let loader = MetadataLoader::new(metadata.clone(), LoaderOptions::default());

    let ncodes: Vec<&str> = works.iter().map(|w| w.ncode.as_str()).collect();
    let results = loader.load_many(&ncodes).await;

    assert!(results.iter().all(|r| matches!(r, Ok(Some(_)))));
    let mut sizes: Vec<usize> = metadata.calls().iter().map(Vec::len).collect();
    sizes.sort_unstable();
    assert_eq!(sizes, vec![100, 500]);
}

#[tokio::test]
async fn lower_case_requests_resolve_to_canonical_records() {
    let metadata = Arc::new(FakeMetadata::new(["N0001AA".to_string()]));
    let loader = MetadataLoader::new(metadata.clone(), LoaderOptions::default());

    let (lower, upper, missing) = tokio::join!(loader.load("n0001aa"), loader.load("N0001AA"), loader.load("N9999ZZ"));

    assert_eq!(lower.unwrap().map(|m| m.ncode), Some("N0001AA".to_string()));
    assert_eq!(upper.unwrap().map(|m| m.ncode), Some("N0001AA".to_string()));
    assert_eq!(missing.unwrap(), None);

    let calls = metadata.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].len(), 2);
}
