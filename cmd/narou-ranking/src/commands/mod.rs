pub mod history;
pub mod native;
pub mod ranking;

use clap::Subcommand;
use serde::Serialize;

use domains::FilteredRankingRecord;
use services::MetadataLoader;

pub use history::HistoryArgs;
pub use native::NativeArgs;
pub use ranking::RankingArgs;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Filtered ranking page built from the search endpoint.
    ///
    /// Example:
    ///   narou-ranking ranking --order daily --max-episodes 30 --one-shot --ongoing
    Ranking(RankingArgs),

    /// Published snapshot ranking for a date.
    ///
    /// Example:
    ///   narou-ranking native --order weekly --date 2024-05-07
    Native(NativeArgs),

    /// Past ranking appearances of one work.
    History(HistoryArgs),
}

/// A ranked record with the title and author looked up through the loader.
#[derive(Debug, Serialize)]
pub struct RankedItem {
    pub rank: usize,
    pub ncode: String,
    pub point: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub writer: Option<String>,
}

/// Looks up every record's metadata in one coalesced round.
pub async fn enrich(loader: &MetadataLoader, records: Vec<FilteredRankingRecord>) -> anyhow::Result<Vec<RankedItem>> {
    let ncodes: Vec<&str> = records.iter().map(|r| r.ncode.as_str()).collect();
    let found = loader.load_many(&ncodes).await;

    records
        .into_iter()
        .zip(found)
        .map(|(record, metadata)| {
            let metadata = metadata?;
            Ok(RankedItem {
                rank: record.rank,
                ncode: record.ncode,
                point: record.point,
                title: metadata.as_ref().map(|m| m.title.clone()),
                writer: metadata.map(|m| m.writer),
            })
        })
        .collect()
}

pub fn plain(records: Vec<FilteredRankingRecord>) -> Vec<RankedItem> {
    records
        .into_iter()
        .map(|record| RankedItem { rank: record.rank, ncode: record.ncode, point: record.point, title: None, writer: None })
        .collect()
}
