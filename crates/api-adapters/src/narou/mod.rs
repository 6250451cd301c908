//! Adapter for the public novel search and ranking API.

pub mod client;
pub mod params;
pub mod wire;

pub use client::{NarouClient, NarouClientConfig, NarouMetadataSource};
