//! Query-string encoding for the novel API.

use chrono::NaiveDate;

use domains::{Field, FieldSet, PeriodKind, RankingDomain, RankingOrder, SearchRequest, StatusFilter};

/// Largest `lim` the search endpoint accepts.
pub const MAX_LIMIT: usize = 500;
/// Largest 1-based `st` the search endpoint accepts.
pub const MAX_START: usize = 2000;

pub fn order_code(order: RankingOrder) -> &'static str {
    match order {
        RankingOrder::Daily => "dailypoint",
        RankingOrder::Weekly => "weeklypoint",
        RankingOrder::Monthly => "monthlypoint",
        RankingOrder::Quarter => "quarterpoint",
        RankingOrder::Yearly => "yearlypoint",
        RankingOrder::Overall => "hyoka",
        RankingOrder::WeeklyUniqueUsers => "weekly",
    }
}

/// Short code used in the `of` output-field parameter.
pub fn field_code(field: Field) -> &'static str {
    match field {
        Field::Ncode => "n",
        Field::Episodes => "ga",
        Field::FirstUpdate => "gf",
        Field::NovelType => "nt",
        Field::End => "e",
        Field::DailyPoint => "dp",
        Field::WeeklyPoint => "wp",
        Field::MonthlyPoint => "mp",
        Field::QuarterPoint => "qp",
        Field::YearlyPoint => "yp",
        Field::OverallPoint => "gp",
        Field::WeeklyUnique => "wu",
    }
}

pub fn status_code(filter: StatusFilter) -> Option<&'static str> {
    match filter {
        StatusFilter::All | StatusFilter::Nothing => None,
        StatusFilter::OneShot => Some("t"),
        StatusFilter::Ongoing => Some("r"),
        StatusFilter::Completed => Some("er"),
        StatusFilter::Serialized => Some("re"),
        StatusFilter::OneShotOrCompleted => Some("ter"),
    }
}

pub fn fields_param(fields: &FieldSet) -> String {
    fields.iter().map(|field| field_code(*field)).collect::<Vec<_>>().join("-")
}

fn join_ids<'a>(ids: impl IntoIterator<Item = &'a u32>) -> String {
    ids.into_iter().map(u32::to_string).collect::<Vec<_>>().join("-")
}

/// Parameters of one search chunk. `st` is 1-based on the wire.
pub fn search_params(request: &SearchRequest) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("out", "json".to_string()),
        ("order", order_code(request.order).to_string()),
        ("st", (request.start + 1).to_string()),
        ("lim", request.limit.clamp(1, MAX_LIMIT).to_string()),
    ];

    if !request.fields.is_empty() {
        params.push(("of", fields_param(&request.fields)));
    }
    if let Some(word) = request.keyword.as_deref().filter(|w| !w.is_empty()) {
        params.push(("word", word.to_string()));
    }
    if let Some(word) = request.exclude_keyword.as_deref().filter(|w| !w.is_empty()) {
        params.push(("notword", word.to_string()));
    }
    if request.by_title {
        params.push(("title", "1".to_string()));
    }
    if request.by_story {
        params.push(("ex", "1".to_string()));
    }
    match &request.domain {
        RankingDomain::General { genres } if !genres.is_empty() => params.push(("genre", join_ids(genres))),
        RankingDomain::R18 { sites } if !sites.is_empty() => params.push(("nocgenre", join_ids(sites))),
        _ => {}
    }
    if let Some(code) = status_code(request.status_filter) {
        params.push(("type", code.to_string()));
    }
    params
}

/// Parameters of a bulk lookup by identifier.
pub fn metadata_params(ncodes: &[String]) -> Vec<(&'static str, String)> {
    vec![
        ("out", "json".to_string()),
        ("ncode", ncodes.join("-")),
        ("lim", ncodes.len().clamp(1, MAX_LIMIT).to_string()),
    ]
}

/// `YYYYMMDD-x` ranking type code.
pub fn rtype(period: PeriodKind, date: NaiveDate) -> String {
    format!("{}-{}", date.format("%Y%m%d"), period.code())
}
