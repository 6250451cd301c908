//! # Predicate Compiler
//!
//! Turns sparse filter options into a record predicate and the minimal set of
//! backend fields needed to evaluate it. Compilation is pure: the same options
//! and the same "now" always produce the same filter, which is reused for
//! every chunk of one logical query.

use chrono::{DateTime, NaiveDate, Utc};
use domains::time::start_of_jst_day;
use domains::{Field, FieldSet, FilterOptions, RawRankingRecord, StatusClass, StatusFilter};

/// Client-side filter the backend cannot express.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Predicate {
    episode_min: Option<u32>,
    episode_max: Option<u32>,
    first_update_from: Option<DateTime<Utc>>,
    include_one_shot: bool,
    include_ongoing: bool,
    include_completed: bool,
}

impl Predicate {
    /// True if `record` passes every active constraint.
    ///
    /// A missing field fails the constraint that needs it, with one
    /// exception: when all three status classes are allowed, status is not
    /// checked (nor fetched), so a record with a missing or unrecognised
    /// class passes.
    pub fn matches(&self, record: &RawRankingRecord) -> bool {
        if self.episode_max.is_some() || self.episode_min.is_some() {
            let Some(episodes) = record.episodes else {
                return false;
            };
            if self.episode_max.is_some_and(|max| episodes > max) {
                return false;
            }
            if self.episode_min.is_some_and(|min| episodes < min) {
                return false;
            }
        }

        if let Some(threshold) = self.first_update_from {
            match record.first_update {
                Some(first_update) if first_update >= threshold => {}
                _ => return false,
            }
        }

        if !self.status_constrained() {
            return true;
        }
        match record.status_class() {
            Some(StatusClass::OneShot) => self.include_one_shot,
            Some(StatusClass::Ongoing) => self.include_ongoing,
            Some(StatusClass::Completed) => self.include_completed,
            None => false,
        }
    }

    /// False when no status class is allowed at all.
    pub fn is_satisfiable(&self) -> bool {
        self.include_one_shot || self.include_ongoing || self.include_completed
    }

    fn status_constrained(&self) -> bool {
        !(self.include_one_shot && self.include_ongoing && self.include_completed)
    }
}

/// Output of [`compile`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledFilter {
    pub predicate: Predicate,
    pub fields: FieldSet,
    pub status_filter: StatusFilter,
    /// Resolved first-update date, part of the chunk cache key.
    pub first_update: Option<NaiveDate>,
}

/// Compiles `options`, resolving any relative date against `now`.
pub fn compile(options: &FilterOptions, now: DateTime<Utc>) -> CompiledFilter {
    let first_update = options.first_update.map(|threshold| threshold.resolve(now));

    let predicate = Predicate {
        episode_min: options.episode_min,
        episode_max: options.episode_max,
        first_update_from: first_update.map(start_of_jst_day),
        include_one_shot: options.include_one_shot,
        include_ongoing: options.include_ongoing,
        include_completed: options.include_completed,
    };

    CompiledFilter {
        predicate,
        fields: required_fields(options),
        status_filter: StatusFilter::from_flags(
            options.include_one_shot,
            options.include_ongoing,
            options.include_completed,
        ),
        first_update,
    }
}

/// The identifier, the order's point field, and one field group per
/// constrained option.
pub fn required_fields(options: &FilterOptions) -> FieldSet {
    let episodes = (options.episode_min.is_some() || options.episode_max.is_some()).then_some(Field::Episodes);
    let first_update = options.first_update.is_some().then_some(Field::FirstUpdate);
    let status: &[Field] = if options.include_one_shot && options.include_ongoing && options.include_completed {
        &[]
    } else {
        &[Field::NovelType, Field::End]
    };

    [Field::Ncode, options.order.point_field()]
        .into_iter()
        .chain(episodes)
        .chain(first_update)
        .chain(status.iter().copied())
        .collect()
}
