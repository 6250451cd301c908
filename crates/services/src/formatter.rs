//! # Rank/Point Formatter
//!
//! Numbers an already filtered and sliced sequence with dense 1-based ranks
//! and pulls out the point value of the requested order.

use domains::{FilteredRankingRecord, RankingOrder, RawRankingRecord};

/// `start_rank` is the number of records already paged past.
pub fn format(order: RankingOrder, records: &[RawRankingRecord], start_rank: usize) -> Vec<FilteredRankingRecord> {
    records
        .iter()
        .enumerate()
        .map(|(index, record)| FilteredRankingRecord {
            ncode: record.ncode.clone(),
            rank: index + start_rank + 1,
            point: point_for(order, record),
        })
        .collect()
}

/// Exactly one field per order. A missing value reads as zero.
pub fn point_for(order: RankingOrder, record: &RawRankingRecord) -> u64 {
    let value = match order {
        RankingOrder::Daily => record.daily_point,
        RankingOrder::Weekly => record.weekly_point,
        RankingOrder::Monthly => record.monthly_point,
        RankingOrder::Quarter => record.quarter_point,
        RankingOrder::Yearly => record.yearly_point,
        RankingOrder::Overall => record.overall_point,
        RankingOrder::WeeklyUniqueUsers => record.weekly_unique,
    };
    value.unwrap_or(0)
}
