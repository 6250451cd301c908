//! # storage-adapters
//!
//! Storage-side implementations of the `domains` ports. Currently the
//! in-memory, time-boxed cache for backend search chunks.

pub mod page_cache;

pub use page_cache::{CacheOptions, InMemoryPageCache};
