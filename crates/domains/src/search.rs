//! # Search Requests
//!
//! What the accumulator asks the backend search endpoint for, what comes
//! back, and the composite key backend chunks are cached under.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::{FieldSet, RankingDomain, RankingOrder, RankingQuery, RawRankingRecord, StatusClass};

/// The subset of status classes the backend can filter on by itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusFilter {
    All,
    OneShot,
    Ongoing,
    Completed,
    /// Ongoing or completed serials.
    Serialized,
    OneShotOrCompleted,
    /// No class allowed; nothing can match.
    Nothing,
}

impl StatusFilter {
    /// Narrowest backend filter still admitting every allowed class.
    /// One-shot plus ongoing has no backend code and falls back to `All`.
    pub fn from_flags(one_shot: bool, ongoing: bool, completed: bool) -> Self {
        match (one_shot, ongoing, completed) {
            (true, true, true) => StatusFilter::All,
            (true, false, false) => StatusFilter::OneShot,
            (false, true, false) => StatusFilter::Ongoing,
            (false, false, true) => StatusFilter::Completed,
            (false, true, true) => StatusFilter::Serialized,
            (true, false, true) => StatusFilter::OneShotOrCompleted,
            (true, true, false) => StatusFilter::All,
            (false, false, false) => StatusFilter::Nothing,
        }
    }

    pub fn admits(self, class: StatusClass) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::OneShot => class == StatusClass::OneShot,
            StatusFilter::Ongoing => class == StatusClass::Ongoing,
            StatusFilter::Completed => class == StatusClass::Completed,
            StatusFilter::Serialized => class != StatusClass::OneShot,
            StatusFilter::OneShotOrCompleted => class != StatusClass::Ongoing,
            StatusFilter::Nothing => false,
        }
    }
}

/// One chunk request against the search endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchRequest {
    pub order: RankingOrder,
    /// 0-based offset of the first record.
    pub start: usize,
    pub limit: usize,
    pub keyword: Option<String>,
    pub exclude_keyword: Option<String>,
    pub by_title: bool,
    pub by_story: bool,
    pub domain: RankingDomain,
    pub status_filter: StatusFilter,
    pub fields: FieldSet,
}

impl SearchRequest {
    pub fn for_chunk(
        query: &RankingQuery,
        status_filter: StatusFilter,
        fields: &FieldSet,
        chunk_size: usize,
        backend_page: usize,
    ) -> Self {
        Self {
            order: query.order,
            start: backend_page.saturating_mul(chunk_size),
            limit: chunk_size,
            keyword: query.keyword.clone(),
            exclude_keyword: query.exclude_keyword.clone(),
            by_title: query.search_in_title,
            by_story: query.search_in_synopsis,
            domain: query.domain.clone(),
            status_filter,
            fields: fields.clone(),
        }
    }
}

/// One chunk of raw records plus the backend's total match count.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchPage {
    pub total_count: usize,
    pub values: Vec<RawRankingRecord>,
}

/// Shared handle to a cached chunk.
pub type SharedPage = Arc<SearchPage>;

/// Composite identity of a backend chunk.
///
/// Keyed on the resolved first-update date rather than the relative term,
/// so entries stay correct across day boundaries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageKey {
    pub order: RankingOrder,
    pub keyword: Option<String>,
    pub exclude_keyword: Option<String>,
    pub by_title: bool,
    pub by_story: bool,
    pub first_update: Option<NaiveDate>,
    pub domain: RankingDomain,
    pub status_filter: StatusFilter,
    pub fields: FieldSet,
    pub chunk_size: usize,
    pub backend_page: usize,
}

impl PageKey {
    pub fn new(request: &SearchRequest, first_update: Option<NaiveDate>, backend_page: usize) -> Self {
        Self {
            order: request.order,
            keyword: request.keyword.clone(),
            exclude_keyword: request.exclude_keyword.clone(),
            by_title: request.by_title,
            by_story: request.by_story,
            first_update,
            domain: request.domain.clone(),
            status_filter: request.status_filter,
            fields: request.fields.clone(),
            chunk_size: request.limit,
            backend_page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_filter_is_the_narrowest_admitting_filter() {
        assert_eq!(StatusFilter::from_flags(true, true, true), StatusFilter::All);
        assert_eq!(StatusFilter::from_flags(false, true, true), StatusFilter::Serialized);
        assert_eq!(StatusFilter::from_flags(true, false, true), StatusFilter::OneShotOrCompleted);
        assert_eq!(StatusFilter::from_flags(true, true, false), StatusFilter::All);
        assert_eq!(StatusFilter::from_flags(false, false, false), StatusFilter::Nothing);

        for one_shot in [false, true] {
            for ongoing in [false, true] {
                for completed in [false, true] {
                    let filter = StatusFilter::from_flags(one_shot, ongoing, completed);
                    assert!(filter.admits(StatusClass::OneShot) || !one_shot);
                    assert!(filter.admits(StatusClass::Ongoing) || !ongoing);
                    assert!(filter.admits(StatusClass::Completed) || !completed);
                }
            }
        }
    }

    #[test]
    fn chunk_requests_offset_by_page() {
        let query = RankingQuery::new(RankingOrder::Weekly).with_genres([101]);
        let request = SearchRequest::for_chunk(&query, StatusFilter::All, &FieldSet::new(), 100, 3);
        assert_eq!(request.start, 300);
        assert_eq!(request.limit, 100);

        let key = PageKey::new(&request, None, 3);
        assert_eq!(key.backend_page, 3);
        assert_eq!(key.chunk_size, 100);
    }
}
