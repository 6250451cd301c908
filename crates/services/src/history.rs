//! # Ranking History
//!
//! Past appearances of one work in the published rankings, used to enrich a
//! work's detail view. Not part of the accumulator path.

use std::sync::Arc;

use serde::Serialize;

use domains::{PeriodKind, RankingHistoryBackend, RankingHistoryEntry, Result};

/// History of one work, split per period and sorted by date.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RankingHistory {
    pub ncode: String,
    pub daily: Vec<RankingHistoryEntry>,
    pub weekly: Vec<RankingHistoryEntry>,
    pub monthly: Vec<RankingHistoryEntry>,
    pub quarterly: Vec<RankingHistoryEntry>,
}

impl RankingHistory {
    pub fn from_entries(ncode: impl Into<String>, entries: Vec<RankingHistoryEntry>) -> Self {
        let mut history = RankingHistory {
            ncode: ncode.into(),
            ..RankingHistory::default()
        };
        for entry in entries {
            history.bucket_mut(entry.period).push(entry);
        }
        for period in [PeriodKind::Daily, PeriodKind::Weekly, PeriodKind::Monthly, PeriodKind::Quarterly] {
            history.bucket_mut(period).sort_by_key(|entry| entry.date);
        }
        history
    }

    pub fn entries(&self, period: PeriodKind) -> &[RankingHistoryEntry] {
        match period {
            PeriodKind::Daily => &self.daily,
            PeriodKind::Weekly => &self.weekly,
            PeriodKind::Monthly => &self.monthly,
            PeriodKind::Quarterly => &self.quarterly,
        }
    }

    /// Highest placement in `period`; the earliest date wins a tie.
    pub fn best_rank(&self, period: PeriodKind) -> Option<&RankingHistoryEntry> {
        self.entries(period).iter().min_by_key(|entry| (entry.rank, entry.date))
    }

    pub fn is_empty(&self) -> bool {
        self.daily.is_empty() && self.weekly.is_empty() && self.monthly.is_empty() && self.quarterly.is_empty()
    }

    fn bucket_mut(&mut self, period: PeriodKind) -> &mut Vec<RankingHistoryEntry> {
        match period {
            PeriodKind::Daily => &mut self.daily,
            PeriodKind::Weekly => &mut self.weekly,
            PeriodKind::Monthly => &mut self.monthly,
            PeriodKind::Quarterly => &mut self.quarterly,
        }
    }
}

pub struct RankingHistoryService {
    backend: Arc<dyn RankingHistoryBackend>,
}

impl RankingHistoryService {
    pub fn new(backend: Arc<dyn RankingHistoryBackend>) -> Self {
        Self { backend }
    }

    pub async fn history(&self, ncode: &str) -> Result<RankingHistory> {
        let entries = self.backend.fetch_history(ncode).await?;
        tracing::debug!(ncode, entries = entries.len(), "ranking history fetched");
        Ok(RankingHistory::from_entries(ncode, entries))
    }
}
