//! # Errors
//!
//! Failure types shared by every crate of the ranking pipeline.
//! Backend failures are cloneable so that one failed batch call can be
//! delivered to every caller waiting on it.

use thiserror::Error;

/// A failed call against the external novel API.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The request did not complete within the configured timeout.
    #[error("backend request timed out: {0}")]
    Timeout(String),

    /// Connection refused, DNS failure, TLS failure and friends.
    #[error("backend transport failure: {0}")]
    Transport(String),

    /// The backend answered with a non-2xx status.
    #[error("backend returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// The body could not be decoded into the expected shape.
    #[error("malformed backend response: {0}")]
    Decode(String),
}

impl BackendError {
    /// Every backend failure is transient from the pipeline's point of view.
    /// Retry policy belongs to the caller.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, BackendError::Decode(_))
    }
}

/// The primary error type for pipeline operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RankingError {
    /// Backend failure, passed through untouched.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// Output pages are 1-based.
    #[error("invalid output page {0}: pages start at 1")]
    InvalidPage(usize),

    /// The order has no published snapshot ranking.
    #[error("order {0} has no native ranking snapshot")]
    UnsupportedOrder(String),

    /// The loader's dispatcher went away before answering this caller.
    #[error("metadata batch aborted before completion")]
    BatchAborted,
}

/// A specialized Result type for pipeline logic.
pub type Result<T> = std::result::Result<T, RankingError>;
