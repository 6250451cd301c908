//! # Native Rankings
//!
//! Unfiltered shapes do not need the accumulator: the backend publishes
//! snapshot rankings for daily, weekly, monthly and quarterly periods.
//! Snapshots are keyed by their publication day, so the requested date is
//! first moved back onto one.

use std::sync::Arc;

use chrono::{Datelike, Days, NaiveDate, Weekday};

use domains::{FilteredRankingRecord, NativeRankingBackend, PeriodKind, RankingError, RankingOrder, Result};

use crate::ranking::page_window_end;

/// The publication day of the snapshot covering `date`.
///
/// Weekly snapshots come out on Tuesdays; monthly and quarterly ones on the
/// first of the month.
pub fn publication_date(period: PeriodKind, date: NaiveDate) -> NaiveDate {
    match period {
        PeriodKind::Daily => date,
        PeriodKind::Weekly => {
            let days_back = (date.weekday().num_days_from_monday() + 7 - Weekday::Tue.num_days_from_monday()) % 7;
            date.checked_sub_days(Days::new(u64::from(days_back))).unwrap_or(date)
        }
        PeriodKind::Monthly | PeriodKind::Quarterly => date.with_day(1).unwrap_or(date),
    }
}

pub struct NativeRankingService {
    backend: Arc<dyn NativeRankingBackend>,
    page_size: usize,
}

impl NativeRankingService {
    pub fn new(backend: Arc<dyn NativeRankingBackend>, page_size: usize) -> Self {
        Self {
            backend,
            page_size: page_size.max(1),
        }
    }

    /// Page `output_page` (1-based) of the snapshot for `order` around `date`.
    pub async fn fetch(&self, order: RankingOrder, date: NaiveDate, output_page: usize) -> Result<Vec<FilteredRankingRecord>> {
        let skip = page_window_end(output_page, self.page_size)? - self.page_size;
        let period = order
            .native_period()
            .ok_or_else(|| RankingError::UnsupportedOrder(order.to_string()))?;

        let published = publication_date(period, date);
        let mut entries = self.backend.fetch_ranking(period, published).await?;
        entries.sort_by_key(|entry| entry.rank);
        tracing::debug!(%order, %published, entries = entries.len(), "native ranking fetched");

        Ok(entries
            .into_iter()
            .skip(skip)
            .take(self.page_size)
            .enumerate()
            .map(|(index, entry)| FilteredRankingRecord {
                ncode: entry.ncode,
                rank: skip + index + 1,
                point: entry.point,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domains::{MockNativeRankingBackend, NativeRankingEntry};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn weekly_snapshots_fall_on_tuesday() {
        // 2024-05-14 is a Tuesday.
        assert_eq!(publication_date(PeriodKind::Weekly, date(2024, 5, 14)), date(2024, 5, 14));
        assert_eq!(publication_date(PeriodKind::Weekly, date(2024, 5, 16)), date(2024, 5, 14));
        assert_eq!(publication_date(PeriodKind::Weekly, date(2024, 5, 13)), date(2024, 5, 7));
    }

    #[test]
    fn monthly_and_quarterly_snapshots_fall_on_the_first() {
        assert_eq!(publication_date(PeriodKind::Monthly, date(2024, 2, 29)), date(2024, 2, 1));
        assert_eq!(publication_date(PeriodKind::Quarterly, date(2024, 7, 9)), date(2024, 7, 1));
        assert_eq!(publication_date(PeriodKind::Daily, date(2024, 7, 9)), date(2024, 7, 9));
    }

    #[tokio::test]
    async fn pages_are_densely_ranked() {
        let mut backend = MockNativeRankingBackend::new();
        backend
            .expect_fetch_ranking()
            .withf(|period, day| *period == PeriodKind::Weekly && *day == NaiveDate::from_ymd_opt(2024, 5, 14).unwrap())
            .times(1)
            .returning(|_, _| {
                Ok((1..=25)
                    .map(|rank| NativeRankingEntry {
                        ncode: format!("N{rank:04}ZZ"),
                        rank,
                        point: u64::from(1_000 - rank),
                    })
                    .collect())
            });

        let service = NativeRankingService::new(Arc::new(backend), 10);
        let page = service.fetch(RankingOrder::Weekly, date(2024, 5, 18), 3).await.unwrap();
        let ranks: Vec<usize> = page.iter().map(|r| r.rank).collect();
        assert_eq!(ranks, vec![21, 22, 23, 24, 25]);
        assert_eq!(page[0].ncode, "N0021ZZ");
    }

    #[tokio::test]
    async fn orders_without_snapshots_are_rejected() {
        let mut backend = MockNativeRankingBackend::new();
        backend.expect_fetch_ranking().never();

        let service = NativeRankingService::new(Arc::new(backend), 10);
        let err = service.fetch(RankingOrder::Overall, date(2024, 5, 18), 1).await.unwrap_err();
        assert_eq!(err, RankingError::UnsupportedOrder("overall".into()));
    }

    #[tokio::test]
    async fn oversized_page_numbers_are_rejected_before_fetching() {
        let mut backend = MockNativeRankingBackend::new();
        backend.expect_fetch_ranking().never();

        let service = NativeRankingService::new(Arc::new(backend), 10);
        let page = usize::MAX / 5;
        let err = service.fetch(RankingOrder::Daily, date(2024, 5, 18), page).await.unwrap_err();
        assert_eq!(err, RankingError::InvalidPage(page));
    }
}
