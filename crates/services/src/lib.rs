//! # services
//!
//! The ranking pipeline itself: predicate compilation, the paginated fetch
//! accumulator, rank formatting, batched metadata loading, and the
//! enrichment lookups built on the backend ports from `domains`.

pub mod formatter;
pub mod history;
pub mod loader;
pub mod native;
pub mod predicate;
pub mod ranking;

pub use history::{RankingHistory, RankingHistoryService};
pub use loader::{LoaderOptions, MetadataLoader};
pub use native::NativeRankingService;
pub use predicate::{compile, CompiledFilter, Predicate};
pub use ranking::{PipelineOptions, RankingPage, RankingService};
