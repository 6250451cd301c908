//! # api-adapters
//!
//! Outbound HTTP implementations of the `domains` backend ports.

pub mod narou;

pub use narou::{NarouClient, NarouClientConfig, NarouMetadataSource};
