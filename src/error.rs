//! Error types for the rollup library
//!
//! Aggregation and rollup passes never fail: unusable values are dropped and
//! missing parameters fall back to defaults. Errors only surface at the edges
//! of the crate, when records arrive as JSON, when configuration is loaded,
//! or when the background service misbehaves.

use thiserror::Error;

use crate::services::ServiceError;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum Error {
    /// A record could not be turned into a [`crate::types::Record`]
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// JSON (de)serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Background service error
    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for library operations
pub type Result<T> = std::result::Result<T, Error>;
