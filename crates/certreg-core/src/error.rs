//! # Error Types
//!
//! Validation failures for issuance input, identifiers, metadata and
//! timestamps. These are caller mistakes: never retried, surfaced as
//! client errors at the API edge.

use thiserror::Error;

/// Input rejected before it reaches the registry state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required text field was empty after trimming.
    #[error("{field} must not be empty")]
    Empty {
        /// Name of the offending field.
        field: &'static str,
    },

    /// A text field exceeded its character limit.
    #[error("{field} must not exceed {max} characters (got {actual})")]
    TooLong {
        /// Name of the offending field.
        field: &'static str,
        /// Maximum permitted characters.
        max: usize,
        /// Characters supplied.
        actual: usize,
    },

    /// The string is not a well-formed certificate identifier.
    #[error("malformed certificate id {0:?}")]
    InvalidCertificateId(String),

    /// The course is not present in the configured catalog.
    #[error("unknown course: {0}")]
    UnknownCourse(String),

    /// A metadata key is empty or too long.
    #[error("invalid metadata key {key:?}: {reason}")]
    InvalidMetadataKey {
        /// The rejected key.
        key: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The metadata map has too many entries.
    #[error("metadata must not exceed {max} entries (got {actual})")]
    TooManyMetadataEntries {
        /// Maximum permitted entries.
        max: usize,
        /// Entries supplied.
        actual: usize,
    },

    /// A timestamp or date string could not be parsed.
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
}
