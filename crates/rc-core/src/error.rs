//! # CatalogError
//!
//! Centralized error handling for the replay catalog.
//! Construction failures are raised by the entities themselves, storage
//! failures by the persistence plugins.

use thiserror::Error;

/// The primary error type for all rc-core operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// A numeric key field could not be coerced to an integer (e.g. Emission.pid = "abc")
    #[error("format error: {field} is not an integer: {value:?}")]
    Format { field: &'static str, value: String },

    /// A stream URL did not parse into a usable absolute URL
    #[error("invalid URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Uniqueness, foreign-key or not-null constraint rejected by the store
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    /// Entity required by an operation is absent from the store
    #[error("{0} not found with key {1}")]
    NotFound(String, String),

    /// The external downloader could not be run to completion
    #[error("fetch failed: {0}")]
    Fetch(String),

    /// Infrastructure failure (e.g., DB file unreadable, pool closed)
    #[error("internal service error: {0}")]
    Internal(String),
}

impl CatalogError {
    pub fn format(field: &'static str, value: impl Into<String>) -> Self {
        CatalogError::Format {
            field,
            value: value.into(),
        }
    }

    pub fn not_found(entity: &str, key: impl ToString) -> Self {
        CatalogError::NotFound(entity.to_string(), key.to_string())
    }
}

/// A specialized Result type for catalog logic.
pub type Result<T> = std::result::Result<T, CatalogError>;
