//! JSON payloads returned by the novel API and their mapping to domain types.

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use domains::time::parse_backend_datetime;
use domains::{
    BackendError, ItemMetadata, NativeRankingEntry, PeriodKind, RankingHistoryEntry, RawRankingRecord, SearchPage,
    StatusClass,
};

/// Leading element of every search response.
#[derive(Debug, Deserialize)]
struct AllCount {
    allcount: usize,
}

/// One work as the search endpoint reports it. Only requested fields are present.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NovelDto {
    pub ncode: String,
    pub title: Option<String>,
    pub userid: Option<u64>,
    pub writer: Option<String>,
    pub story: Option<String>,
    pub biggenre: Option<u32>,
    pub genre: Option<u32>,
    pub nocgenre: Option<u32>,
    pub keyword: Option<String>,
    pub general_firstup: Option<String>,
    pub general_lastup: Option<String>,
    pub noveltype: Option<u8>,
    pub end: Option<u8>,
    pub general_all_no: Option<u32>,
    pub length: Option<u64>,
    pub global_point: Option<u64>,
    pub daily_point: Option<u64>,
    pub weekly_point: Option<u64>,
    pub monthly_point: Option<u64>,
    pub quarter_point: Option<u64>,
    pub yearly_point: Option<u64>,
    pub weekly_unique: Option<u64>,
}

impl NovelDto {
    fn first_update(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        self.general_firstup.as_deref().and_then(parse_backend_datetime)
    }

    pub fn into_record(self) -> RawRankingRecord {
        let first_update = self.first_update();
        RawRankingRecord {
            ncode: self.ncode,
            episodes: self.general_all_no,
            first_update,
            novel_type: self.noveltype,
            end: self.end,
            daily_point: self.daily_point,
            weekly_point: self.weekly_point,
            monthly_point: self.monthly_point,
            quarter_point: self.quarter_point,
            yearly_point: self.yearly_point,
            overall_point: self.global_point,
            weekly_unique: self.weekly_unique,
        }
    }

    pub fn into_metadata(self) -> ItemMetadata {
        let first_update = self.first_update();
        let last_update = self.general_lastup.as_deref().and_then(parse_backend_datetime);
        let status = StatusClass::classify(self.noveltype, self.end);
        let keywords = self
            .keyword
            .as_deref()
            .map(|raw| raw.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default();

        ItemMetadata {
            ncode: self.ncode,
            title: self.title.unwrap_or_default(),
            user_id: self.userid,
            writer: self.writer.unwrap_or_default(),
            story: self.story.unwrap_or_default(),
            big_genre: self.biggenre,
            genre: self.genre.or(self.nocgenre),
            keywords,
            first_update,
            last_update,
            status,
            episodes: self.general_all_no,
            length: self.length,
            overall_point: self.global_point,
        }
    }
}

#[derive(Debug, Deserialize)]
struct HistoryDto {
    rtype: String,
    rank: u32,
    pt: u64,
}

#[derive(Debug, Deserialize)]
struct SnapshotDto {
    ncode: String,
    rank: u32,
    pt: u64,
}

fn decode_error(err: serde_json::Error) -> BackendError {
    BackendError::Decode(err.to_string())
}

fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, BackendError> {
    serde_json::from_slice(body).map_err(decode_error)
}

/// Splits a search response into the leading count and the works that follow it.
pub fn parse_novels(body: &[u8]) -> Result<(usize, Vec<NovelDto>), BackendError> {
    let mut values: Vec<Value> = decode(body)?;
    if values.is_empty() {
        return Err(BackendError::Decode("response array has no allcount header".into()));
    }
    let header: AllCount = serde_json::from_value(values.remove(0)).map_err(decode_error)?;
    let novels = values
        .into_iter()
        .map(serde_json::from_value)
        .collect::<Result<Vec<NovelDto>, _>>()
        .map_err(decode_error)?;
    Ok((header.allcount, novels))
}

pub fn parse_search_page(body: &[u8]) -> Result<SearchPage, BackendError> {
    let (total_count, novels) = parse_novels(body)?;
    Ok(SearchPage {
        total_count,
        values: novels.into_iter().map(NovelDto::into_record).collect(),
    })
}

pub fn parse_metadata(body: &[u8]) -> Result<Vec<ItemMetadata>, BackendError> {
    let (_, novels) = parse_novels(body)?;
    Ok(novels.into_iter().map(NovelDto::into_metadata).collect())
}

/// Parses `YYYYMMDD-x`.
pub fn parse_rtype(rtype: &str) -> Option<(NaiveDate, PeriodKind)> {
    let (date, code) = rtype.split_once('-')?;
    let date = NaiveDate::parse_from_str(date, "%Y%m%d").ok()?;
    let mut chars = code.chars();
    let period = PeriodKind::from_code(chars.next()?)?;
    chars.next().is_none().then_some((date, period))
}

/// Entries with an unrecognised `rtype` are skipped.
pub fn parse_history(body: &[u8]) -> Result<Vec<RankingHistoryEntry>, BackendError> {
    let rows: Vec<HistoryDto> = decode(body)?;
    Ok(rows
        .into_iter()
        .filter_map(|row| match parse_rtype(&row.rtype) {
            Some((date, period)) => Some(RankingHistoryEntry { date, period, rank: row.rank, point: row.pt }),
            None => {
                tracing::debug!(rtype = %row.rtype, "skipping history row with unknown rtype");
                None
            }
        })
        .collect())
}

pub fn parse_snapshot(body: &[u8]) -> Result<Vec<NativeRankingEntry>, BackendError> {
    let rows: Vec<SnapshotDto> = decode(body)?;
    Ok(rows
        .into_iter()
        .map(|row| NativeRankingEntry { ncode: row.ncode, rank: row.rank, point: row.pt })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    const SEARCH_BODY: &str = r#"[
        {"allcount": 1234},
        {"ncode": "N1234AB", "general_all_no": 12, "general_firstup": "2024-04-01 09:30:00",
         "noveltype": 1, "end": 1, "daily_point": 88},
        {"ncode": "N9999ZZ", "noveltype": 2, "end": 0, "daily_point": 40}
    ]"#;

    #[test]
    fn search_body_yields_count_and_records() {
        let page = parse_search_page(SEARCH_BODY.as_bytes()).unwrap();
        assert_eq!(page.total_count, 1234);
        assert_eq!(page.values.len(), 2);

        let first = &page.values[0];
        assert_eq!(first.ncode, "N1234AB");
        assert_eq!(first.episodes, Some(12));
        assert_eq!(first.daily_point, Some(88));
        assert_eq!(first.first_update, Some(Utc.with_ymd_and_hms(2024, 4, 1, 0, 30, 0).unwrap()));
        assert_eq!(first.status_class(), Some(StatusClass::Ongoing));

        let second = &page.values[1];
        assert_eq!(second.episodes, None);
        assert_eq!(second.status_class(), Some(StatusClass::OneShot));
    }

    #[test]
    fn count_only_body_is_an_empty_chunk() {
        let page = parse_search_page(br#"[{"allcount": 0}]"#).unwrap();
        assert_eq!(page, SearchPage::default());
    }

    #[test]
    fn malformed_bodies_are_decode_errors() {
        assert!(matches!(parse_search_page(b"[]"), Err(BackendError::Decode(_))));
        assert!(matches!(parse_search_page(b"{\"error\":1}"), Err(BackendError::Decode(_))));
        assert!(matches!(parse_search_page(b"[{\"total\":3}]"), Err(BackendError::Decode(_))));
    }

    #[test]
    fn metadata_splits_keywords_and_maps_r18_genre() {
        let body = r#"[{"allcount": 1},
            {"ncode": "N0001AA", "title": "t", "writer": "w", "story": "s", "userid": 7,
             "nocgenre": 2, "keyword": "異世界 転生  ファンタジー",
             "noveltype": 1, "end": 0, "global_point": 500, "length": 12000}]"#;
        let items = parse_metadata(body.as_bytes()).unwrap();
        assert_eq!(items.len(), 1);
        let item = &items[0];
        assert_eq!(item.user_id, Some(7));
        assert_eq!(item.genre, Some(2));
        assert_eq!(item.keywords, vec!["異世界", "転生", "ファンタジー"]);
        assert_eq!(item.status, Some(StatusClass::Completed));
        assert_eq!(item.overall_point, Some(500));
    }

    #[test]
    fn rtype_parsing() {
        let date = NaiveDate::from_ymd_opt(2013, 5, 1).unwrap();
        assert_eq!(parse_rtype("20130501-w"), Some((date, PeriodKind::Weekly)));
        assert_eq!(parse_rtype("20130501-x"), None);
        assert_eq!(parse_rtype("20130501-dd"), None);
        assert_eq!(parse_rtype("2013-05-01"), None);
    }

    #[test]
    fn history_skips_unknown_rtypes() {
        let body = r#"[
            {"pt": 1200, "rank": 3, "rtype": "20130501-d"},
            {"pt": 10, "rank": 300, "rtype": "garbage"},
            {"pt": 5000, "rank": 1, "rtype": "20130401-m"}
        ]"#;
        let entries = parse_history(body.as_bytes()).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].period, PeriodKind::Daily);
        assert_eq!(entries[0].rank, 3);
        assert_eq!(entries[1].period, PeriodKind::Monthly);
        assert_eq!(entries[1].point, 5000);
    }

    #[test]
    fn snapshot_rows_map_directly() {
        let body = r#"[{"ncode": "N1", "pt": 900, "rank": 1}, {"ncode": "N2", "pt": 800, "rank": 2}]"#;
        let entries = parse_snapshot(body.as_bytes()).unwrap();
        assert_eq!(
            entries,
            vec![
                NativeRankingEntry { ncode: "N1".into(), rank: 1, point: 900 },
                NativeRankingEntry { ncode: "N2".into(), rank: 2, point: 800 },
            ]
        );
    }
}
