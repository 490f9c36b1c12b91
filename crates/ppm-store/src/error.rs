//! Error type for install-state persistence.

use std::path::PathBuf;
use thiserror::Error;

/// Errors reading or writing installed-package state.
#[derive(Debug, Error)]
pub enum StoreError {
    /// IO error with path context.
    #[error("IO error at {}: {message}", path.display())]
    Io { path: PathBuf, message: String },

    /// The on-disk file was not in the expected one-entry-per-line format.
    #[error("malformed store file {}: {reason}", path.display())]
    Malformed { path: PathBuf, reason: String },

    /// Queried a package name absent from the install state.
    #[error("package '{name}' is not installed")]
    NotInstalled { name: String },
}

impl StoreError {
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: err.to_string(),
        }
    }

    #[must_use]
    pub fn malformed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Malformed {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

impl From<StoreError> for ppm_core::Error {
    fn from(err: StoreError) -> Self {
        let kind = match &err {
            StoreError::Io { .. } => ppm_core::ErrorKind::Io,
            StoreError::Malformed { .. } => ppm_core::ErrorKind::BadFormat,
            StoreError::NotInstalled { .. } => ppm_core::ErrorKind::NotFound,
        };
        ppm_core::Error::new(kind, err.to_string())
    }
}
