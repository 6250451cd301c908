//! narou-ranking/crates/domains/src/lib.rs
//!
//! The domain models and port definitions of the ranking pipeline.

pub mod error;
pub mod models;
pub mod search;
pub mod time;
pub mod traits;

// Re-exporting for easier access in other crates
pub use error::*;
pub use models::*;
pub use search::*;
pub use traits::*;
