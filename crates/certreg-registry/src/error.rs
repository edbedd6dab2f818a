//! # Registry Errors
//!
//! Three failure classes reach callers: bad input ([`RegistryError::Validation`]),
//! unknown id ([`RegistryError::NotFound`]) and storage failure
//! ([`RegistryError::Persistence`]). A persistence error means the operation
//! did not take effect; callers must not assume success.

use std::path::PathBuf;

use thiserror::Error;

use certreg_core::ValidationError;

/// Error returned by registry operations.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// Issuance or update input was rejected.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// No certificate with this id was ever issued.
    #[error("certificate {0} not found")]
    NotFound(String),

    /// The store failed to durably commit or read.
    #[error("persistence failure: {0}")]
    Persistence(#[from] PersistenceError),
}

/// Storage layer failure.
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// Filesystem operation failed.
    #[error("i/o error on {path}: {source}")]
    Io {
        /// File or directory involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Records could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The data file exists but does not hold a valid registry document.
    #[error("corrupt data file {path}: {reason}")]
    Corrupt {
        /// Data file path.
        path: PathBuf,
        /// What is wrong with it.
        reason: String,
    },

    /// Every generated candidate id was already taken.
    #[error("no unused certificate id after {attempts} attempts")]
    IdSpaceExhausted {
        /// Candidates tried.
        attempts: u32,
    },
}

impl PersistenceError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
