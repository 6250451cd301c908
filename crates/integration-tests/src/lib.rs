//! Shared fixtures for the cross-crate tests: an in-memory catalogue that
//! behaves like the search and lookup endpoints, with call recording.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use domains::{
    BackendError, Field, ItemMetadata, MetadataBackend, RankingOrder, RawRankingRecord, SearchBackend, SearchPage,
    SearchRequest, NOVEL_TYPE_SERIAL, NOVEL_TYPE_SHORT,
};

/// 2024-06-01 12:00 UTC, the "now" of every fixture.
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

/// Work `i` of a synthetic catalogue of `total` works.
///
/// Daily points fall with `i`, weekly points rise with it, so the two orders
/// are reversed. Every fifth work is a one-shot, every third serial is
/// completed, episode counts cycle through 1..=60.
pub fn work(i: usize, total: usize) -> RawRankingRecord {
    let one_shot = i % 5 == 0;
    RawRankingRecord {
        episodes: Some(if one_shot { 1 } else { (i * 7 % 60) as u32 + 1 }),
        first_update: Some(fixed_now() - chrono::Duration::days(i as i64)),
        novel_type: Some(if one_shot { NOVEL_TYPE_SHORT } else { NOVEL_TYPE_SERIAL }),
        end: Some(if !one_shot && i % 3 == 0 { 0 } else { 1 }),
        daily_point: Some(((total - i) * 10) as u64),
        weekly_point: Some(((i + 1) * 3) as u64),
        monthly_point: Some(1_000 + i as u64),
        quarter_point: Some(2_000 + i as u64),
        yearly_point: Some(3_000 + i as u64),
        overall_point: Some(10_000 + i as u64),
        weekly_unique: Some(i as u64),
        ..RawRankingRecord::new(format!("N{i:04}AA"))
    }
}

pub fn catalogue(total: usize) -> Vec<RawRankingRecord> {
    (0..total).map(|i| work(i, total)).collect()
}

/// Keeps only the fields a search asked for.
fn project(record: &RawRankingRecord, request: &SearchRequest) -> RawRankingRecord {
    let wants = |field: Field| request.fields.is_empty() || request.fields.contains(&field);
    let keep = |field: Field, value: Option<u64>| value.filter(|_| wants(field));
    RawRankingRecord {
        ncode: record.ncode.clone(),
        episodes: record.episodes.filter(|_| wants(Field::Episodes)),
        first_update: record.first_update.filter(|_| wants(Field::FirstUpdate)),
        novel_type: record.novel_type.filter(|_| wants(Field::NovelType)),
        end: record.end.filter(|_| wants(Field::End)),
        daily_point: keep(Field::DailyPoint, record.daily_point),
        weekly_point: keep(Field::WeeklyPoint, record.weekly_point),
        monthly_point: keep(Field::MonthlyPoint, record.monthly_point),
        quarter_point: keep(Field::QuarterPoint, record.quarter_point),
        yearly_point: keep(Field::YearlyPoint, record.yearly_point),
        overall_point: keep(Field::OverallPoint, record.overall_point),
        weekly_unique: keep(Field::WeeklyUnique, record.weekly_unique),
    }
}

/// Sort key the search endpoint would use for `order`.
pub fn order_point(order: RankingOrder, record: &RawRankingRecord) -> u64 {
    let point = match order {
        RankingOrder::Daily => record.daily_point,
        RankingOrder::Weekly => record.weekly_point,
        RankingOrder::Monthly => record.monthly_point,
        RankingOrder::Quarter => record.quarter_point,
        RankingOrder::Yearly => record.yearly_point,
        RankingOrder::Overall => record.overall_point,
        RankingOrder::WeeklyUniqueUsers => record.weekly_unique,
    };
    point.unwrap_or_default()
}

/// Search endpoint over a fixed catalogue.
pub struct FakeSearch {
    works: Vec<RawRankingRecord>,
    latency: Duration,
    calls: AtomicUsize,
    requests: Mutex<Vec<SearchRequest>>,
}

impl FakeSearch {
    pub fn new(works: Vec<RawRankingRecord>) -> Self {
        Self { works, latency: Duration::ZERO, calls: AtomicUsize::new(0), requests: Mutex::new(Vec::new()) }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<SearchRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchBackend for FakeSearch {
    async fn search(&self, request: &SearchRequest) -> Result<SearchPage, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let mut matching: Vec<&RawRankingRecord> = self
            .works
            .iter()
            .filter(|record| record.status_class().is_some_and(|class| request.status_filter.admits(class)))
            .collect();
        matching.sort_by_key(|record| std::cmp::Reverse(order_point(request.order, record)));

        let values = matching
            .iter()
            .skip(request.start)
            .take(request.limit)
            .map(|record| project(record, request))
            .collect();
        Ok(SearchPage { total_count: matching.len(), values })
    }
}

/// Lookup endpoint that knows every work of a catalogue by its upper-case code.
#[derive(Default)]
pub struct FakeMetadata {
    known: Vec<String>,
    calls: Mutex<Vec<Vec<String>>>,
}

impl FakeMetadata {
    pub fn new(ncodes: impl IntoIterator<Item = String>) -> Self {
        Self { known: ncodes.into_iter().collect(), calls: Mutex::new(Vec::new()) }
    }

    pub fn for_catalogue(works: &[RawRankingRecord]) -> Self {
        Self::new(works.iter().map(|record| record.ncode.clone()))
    }

    /// Identifier lists of every call so far.
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }
}

pub fn title_of(ncode: &str) -> String {
    format!("Title of {ncode}")
}

#[async_trait]
impl MetadataBackend for FakeMetadata {
    async fn fetch_metadata(&self, ncodes: &[String]) -> Result<Vec<ItemMetadata>, BackendError> {
        self.calls.lock().unwrap().push(ncodes.to_vec());
        Ok(ncodes
            .iter()
            .filter_map(|requested| self.known.iter().find(|known| known.eq_ignore_ascii_case(requested)))
            .map(|ncode| ItemMetadata { ncode: ncode.clone(), title: title_of(ncode), ..ItemMetadata::default() })
            .collect())
    }
}

