//! Cross-crate behaviour of the domain types: query shapes, compiled filters
//! and the cache keys they produce.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use domains::{
    Field, FirstUpdateThreshold, PageKey, RankingDomain, RankingOrder, RankingQuery, RelativeTerm, SearchRequest,
    StatusClass, StatusFilter,
};
use integration_tests::{fixed_now, work};
use services::compile;

#[test]
fn every_order_parses_from_its_name() {
    for order in RankingOrder::ALL {
        assert_eq!(order.as_str().parse::<RankingOrder>(), Ok(order));
        assert_eq!(order.to_string().to_uppercase().parse::<RankingOrder>(), Ok(order));
    }
    assert!("hourly".parse::<RankingOrder>().is_err());
}

#[test]
fn native_snapshots_exist_for_four_orders() {
    let with_snapshot: Vec<RankingOrder> =
        RankingOrder::ALL.into_iter().filter(|order| order.native_period().is_some()).collect();
    assert_eq!(
        with_snapshot,
        vec![RankingOrder::Daily, RankingOrder::Weekly, RankingOrder::Monthly, RankingOrder::Quarter]
    );
}

#[test]
fn fixture_statuses_cover_every_class() {
    assert_eq!(work(0, 10).status_class(), Some(StatusClass::OneShot));
    assert_eq!(work(1, 10).status_class(), Some(StatusClass::Ongoing));
    assert_eq!(work(3, 10).status_class(), Some(StatusClass::Completed));
}

#[test]
fn compiled_filter_matches_the_fixture_catalogue() {
    let query = RankingQuery::new(RankingOrder::Daily)
        .with_episode_range(Some(1), Some(30))
        .with_statuses(true, true, false);
    let filter = compile(&query.filter_options(), fixed_now());

    assert_eq!(filter.status_filter, StatusFilter::All);
    assert!(filter.fields.contains(&Field::Episodes));
    assert!(filter.fields.contains(&Field::NovelType));
    assert!(!filter.fields.contains(&Field::FirstUpdate));

    // One-shot, one episode
    assert!(filter.predicate.matches(&work(0, 100)));
    // Completed serial
    assert!(!filter.predicate.matches(&work(3, 100)));
    // Ongoing serial with 50 episodes
    assert_eq!(work(7, 100).episodes, Some(50));
    assert!(!filter.predicate.matches(&work(7, 100)));
}

#[test]
fn cache_keys_track_the_resolved_date_not_the_term() {
    let relative = RankingQuery::new(RankingOrder::Daily)
        .with_first_update(FirstUpdateThreshold::Relative(RelativeTerm::days(7)));
    let absolute = RankingQuery::new(RankingOrder::Daily)
        .with_first_update(FirstUpdateThreshold::Absolute(NaiveDate::from_ymd_opt(2024, 5, 25).unwrap()));

    let key = |query: &RankingQuery| {
        let filter = compile(&query.filter_options(), fixed_now());
        let request = SearchRequest::for_chunk(query, filter.status_filter, &filter.fields, 100, 0);
        PageKey::new(&request, filter.first_update, 0)
    };

    // 2024-06-01 minus seven days
    assert_eq!(key(&relative), key(&absolute));
}

#[test]
fn genre_order_does_not_change_the_domain() {
    let a = RankingQuery::new(RankingOrder::Weekly).with_genres([102, 101, 201]);
    let b = RankingQuery::new(RankingOrder::Weekly).with_genres([201, 101, 102]);
    assert_eq!(a.domain, b.domain);
    assert_eq!(a.domain, RankingDomain::General { genres: BTreeSet::from([101, 102, 201]) });
}
