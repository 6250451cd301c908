//! # Domain Models
//!
//! These structs represent the ranking shapes a caller can ask for and the
//! records the external novel API hands back.
//! Identifiers ("ncodes") are externally assigned and case-insensitive.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Days, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::time::jst_date;

/// The metric the backend sorts a period's records by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankingOrder {
    Daily,
    Weekly,
    Monthly,
    Quarter,
    Yearly,
    /// Overall evaluation points accumulated over the work's lifetime.
    Overall,
    /// Unique readers over the last week.
    WeeklyUniqueUsers,
}

impl RankingOrder {
    pub const ALL: [RankingOrder; 7] = [
        RankingOrder::Daily,
        RankingOrder::Weekly,
        RankingOrder::Monthly,
        RankingOrder::Quarter,
        RankingOrder::Yearly,
        RankingOrder::Overall,
        RankingOrder::WeeklyUniqueUsers,
    ];

    /// The single record field holding this order's point value.
    pub fn point_field(self) -> Field {
        match self {
            RankingOrder::Daily => Field::DailyPoint,
            RankingOrder::Weekly => Field::WeeklyPoint,
            RankingOrder::Monthly => Field::MonthlyPoint,
            RankingOrder::Quarter => Field::QuarterPoint,
            RankingOrder::Yearly => Field::YearlyPoint,
            RankingOrder::Overall => Field::OverallPoint,
            RankingOrder::WeeklyUniqueUsers => Field::WeeklyUnique,
        }
    }

    /// The snapshot period published for this order, if any.
    pub fn native_period(self) -> Option<PeriodKind> {
        match self {
            RankingOrder::Daily => Some(PeriodKind::Daily),
            RankingOrder::Weekly => Some(PeriodKind::Weekly),
            RankingOrder::Monthly => Some(PeriodKind::Monthly),
            RankingOrder::Quarter => Some(PeriodKind::Quarterly),
            RankingOrder::Yearly | RankingOrder::Overall | RankingOrder::WeeklyUniqueUsers => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RankingOrder::Daily => "daily",
            RankingOrder::Weekly => "weekly",
            RankingOrder::Monthly => "monthly",
            RankingOrder::Quarter => "quarter",
            RankingOrder::Yearly => "yearly",
            RankingOrder::Overall => "overall",
            RankingOrder::WeeklyUniqueUsers => "weekly_unique_users",
        }
    }
}

impl fmt::Display for RankingOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RankingOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RankingOrder::ALL
            .into_iter()
            .find(|order| order.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown ranking order '{s}'"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TermUnit {
    Days,
    Months,
    Years,
}

/// "N units before now". Resolved when a query runs, never when it is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelativeTerm {
    pub amount: u32,
    pub unit: TermUnit,
}

impl RelativeTerm {
    pub fn days(amount: u32) -> Self {
        Self { amount, unit: TermUnit::Days }
    }

    pub fn months(amount: u32) -> Self {
        Self { amount, unit: TermUnit::Months }
    }

    pub fn years(amount: u32) -> Self {
        Self { amount, unit: TermUnit::Years }
    }

    /// Steps back from `today`, saturating at the earliest representable date.
    pub fn resolve_from(&self, today: NaiveDate) -> NaiveDate {
        let resolved = match self.unit {
            TermUnit::Days => today.checked_sub_days(Days::new(u64::from(self.amount))),
            TermUnit::Months => today.checked_sub_months(Months::new(self.amount)),
            TermUnit::Years => self
                .amount
                .checked_mul(12)
                .and_then(|months| today.checked_sub_months(Months::new(months))),
        };
        resolved.unwrap_or(NaiveDate::MIN)
    }
}

/// Minimum first-publication date a work must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FirstUpdateThreshold {
    Absolute(NaiveDate),
    Relative(RelativeTerm),
}

impl FirstUpdateThreshold {
    /// Resolves to a calendar date in the backend's timezone.
    pub fn resolve(&self, now: DateTime<Utc>) -> NaiveDate {
        match self {
            FirstUpdateThreshold::Absolute(date) => *date,
            FirstUpdateThreshold::Relative(term) => term.resolve_from(jst_date(now)),
        }
    }
}

/// Which site a ranking is drawn from. The R18 site has its own endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Site {
    General,
    R18,
}

/// Genre filter for the general site or sub-site filter for the R18 site.
/// The two are mutually exclusive; ordered sets keep identity order-independent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankingDomain {
    General { genres: BTreeSet<u32> },
    R18 { sites: BTreeSet<u32> },
}

impl Default for RankingDomain {
    fn default() -> Self {
        RankingDomain::General { genres: BTreeSet::new() }
    }
}

impl RankingDomain {
    pub fn site(&self) -> Site {
        match self {
            RankingDomain::General { .. } => Site::General,
            RankingDomain::R18 { .. } => Site::R18,
        }
    }
}

/// One ranking shape requested by a consumer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RankingQuery {
    pub order: RankingOrder,
    pub keyword: Option<String>,
    pub exclude_keyword: Option<String>,
    pub search_in_title: bool,
    pub search_in_synopsis: bool,
    pub domain: RankingDomain,
    pub episode_min: Option<u32>,
    pub episode_max: Option<u32>,
    pub first_update: Option<FirstUpdateThreshold>,
    pub include_ongoing: bool,
    pub include_completed: bool,
    pub include_one_shot: bool,
}

impl RankingQuery {
    /// An unfiltered ranking for `order` over the whole general site.
    pub fn new(order: RankingOrder) -> Self {
        Self {
            order,
            keyword: None,
            exclude_keyword: None,
            search_in_title: false,
            search_in_synopsis: false,
            domain: RankingDomain::default(),
            episode_min: None,
            episode_max: None,
            first_update: None,
            include_ongoing: true,
            include_completed: true,
            include_one_shot: true,
        }
    }

    pub fn with_keyword(mut self, keyword: impl Into<String>, in_title: bool, in_synopsis: bool) -> Self {
        self.keyword = Some(keyword.into());
        self.search_in_title = in_title;
        self.search_in_synopsis = in_synopsis;
        self
    }

    pub fn with_exclude_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.exclude_keyword = Some(keyword.into());
        self
    }

    pub fn with_genres(mut self, genres: impl IntoIterator<Item = u32>) -> Self {
        self.domain = RankingDomain::General { genres: genres.into_iter().collect() };
        self
    }

    pub fn with_r18_sites(mut self, sites: impl IntoIterator<Item = u32>) -> Self {
        self.domain = RankingDomain::R18 { sites: sites.into_iter().collect() };
        self
    }

    pub fn with_episode_range(mut self, min: Option<u32>, max: Option<u32>) -> Self {
        self.episode_min = min;
        self.episode_max = max;
        self
    }

    pub fn with_first_update(mut self, threshold: FirstUpdateThreshold) -> Self {
        self.first_update = Some(threshold);
        self
    }

    pub fn with_statuses(mut self, one_shot: bool, ongoing: bool, completed: bool) -> Self {
        self.include_one_shot = one_shot;
        self.include_ongoing = ongoing;
        self.include_completed = completed;
        self
    }

    /// The sparse subset of the query that the client-side filter depends on.
    pub fn filter_options(&self) -> FilterOptions {
        FilterOptions {
            order: self.order,
            episode_min: self.episode_min,
            episode_max: self.episode_max,
            first_update: self.first_update,
            include_ongoing: self.include_ongoing,
            include_completed: self.include_completed,
            include_one_shot: self.include_one_shot,
        }
    }
}

/// Input of the predicate compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FilterOptions {
    pub order: RankingOrder,
    pub episode_min: Option<u32>,
    pub episode_max: Option<u32>,
    pub first_update: Option<FirstUpdateThreshold>,
    pub include_ongoing: bool,
    pub include_completed: bool,
    pub include_one_shot: bool,
}

/// A backend field that can be requested for raw records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Ncode,
    Episodes,
    FirstUpdate,
    NovelType,
    End,
    DailyPoint,
    WeeklyPoint,
    MonthlyPoint,
    QuarterPoint,
    YearlyPoint,
    OverallPoint,
    WeeklyUnique,
}

pub type FieldSet = BTreeSet<Field>;

/// The three mutually exclusive publication states of a work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusClass {
    OneShot,
    Ongoing,
    Completed,
}

/// Backend code for a serialized work.
pub const NOVEL_TYPE_SERIAL: u8 = 1;
/// Backend code for a one-shot (short story).
pub const NOVEL_TYPE_SHORT: u8 = 2;

impl StatusClass {
    /// Classifies from the backend's novel type and end flag.
    /// The end flag is 1 while a serial is running and 0 once it is finished.
    pub fn classify(novel_type: Option<u8>, end: Option<u8>) -> Option<StatusClass> {
        match (novel_type?, end) {
            (NOVEL_TYPE_SHORT, _) => Some(StatusClass::OneShot),
            (NOVEL_TYPE_SERIAL, Some(1)) => Some(StatusClass::Ongoing),
            (NOVEL_TYPE_SERIAL, Some(0)) => Some(StatusClass::Completed),
            _ => None,
        }
    }
}

/// One record of a backend chunk. Only requested fields are populated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRankingRecord {
    pub ncode: String,
    pub episodes: Option<u32>,
    pub first_update: Option<DateTime<Utc>>,
    pub novel_type: Option<u8>,
    pub end: Option<u8>,
    pub daily_point: Option<u64>,
    pub weekly_point: Option<u64>,
    pub monthly_point: Option<u64>,
    pub quarter_point: Option<u64>,
    pub yearly_point: Option<u64>,
    pub overall_point: Option<u64>,
    pub weekly_unique: Option<u64>,
}

impl RawRankingRecord {
    pub fn new(ncode: impl Into<String>) -> Self {
        Self { ncode: ncode.into(), ..Self::default() }
    }

    pub fn status_class(&self) -> Option<StatusClass> {
        StatusClass::classify(self.novel_type, self.end)
    }
}

/// A ranked entry of an output page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilteredRankingRecord {
    pub ncode: String,
    /// 1-based dense rank assigned by output position.
    pub rank: usize,
    pub point: u64,
}

/// Full display record for one work.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemMetadata {
    pub ncode: String,
    pub title: String,
    pub user_id: Option<u64>,
    pub writer: String,
    pub story: String,
    pub big_genre: Option<u32>,
    pub genre: Option<u32>,
    pub keywords: Vec<String>,
    pub first_update: Option<DateTime<Utc>>,
    pub last_update: Option<DateTime<Utc>>,
    pub status: Option<StatusClass>,
    pub episodes: Option<u32>,
    /// Length in characters.
    pub length: Option<u64>,
    pub overall_point: Option<u64>,
}

/// Period a published snapshot ranking covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodKind {
    Daily,
    Weekly,
    Monthly,
    Quarterly,
}

impl PeriodKind {
    /// Suffix used in the backend's `YYYYMMDD-x` ranking type codes.
    pub fn code(self) -> char {
        match self {
            PeriodKind::Daily => 'd',
            PeriodKind::Weekly => 'w',
            PeriodKind::Monthly => 'm',
            PeriodKind::Quarterly => 'q',
        }
    }

    pub fn from_code(code: char) -> Option<Self> {
        match code {
            'd' => Some(PeriodKind::Daily),
            'w' => Some(PeriodKind::Weekly),
            'm' => Some(PeriodKind::Monthly),
            'q' => Some(PeriodKind::Quarterly),
            _ => None,
        }
    }
}

/// One past appearance of a work in a published ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingHistoryEntry {
    pub date: NaiveDate,
    pub period: PeriodKind,
    pub rank: u32,
    pub point: u64,
}

/// One entry of a published snapshot ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeRankingEntry {
    pub ncode: String,
    pub rank: u32,
    pub point: u64,
}
