//! Core type definitions for Canopy.
//!
//! This crate defines the small, dependency-light types shared by the node
//! model and the service client:
//! - Handle and request identifiers
//! - Canonical timestamps whose string encoding sorts chronologically
//!
//! Schema and node types live in `canopy-model`; everything that talks to a
//! remote daemon lives in `canopy-service`.

mod ids;
mod timestamp;

pub use ids::{HandleId, RequestId};
pub use timestamp::{Timestamp, CANONICAL_FORMAT, MAX_YEAR, MIN_YEAR};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid UUID: {0}")]
    InvalidUuid(#[from] uuid::Error),

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
}
