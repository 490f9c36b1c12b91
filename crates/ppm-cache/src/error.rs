//! Error type for fetching and caching package archives.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("transport error fetching {url}: {message}")]
    Network { url: String, message: String },

    #[error("{url} returned HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("downloaded content for {url} failed digest check: expected {expected}, got {actual}")]
    BadDigest {
        url: String,
        expected: String,
        actual: String,
    },

    #[error("no remote resource available for {name}")]
    ResourceUnavailable { name: String },

    #[error("IO error at {}: {message}", path.display())]
    Io { path: PathBuf, message: String },
}

impl CacheError {
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CacheError>;

impl From<CacheError> for ppm_core::Error {
    fn from(err: CacheError) -> Self {
        let kind = match &err {
            CacheError::Network { .. } | CacheError::HttpStatus { .. } => {
                ppm_core::ErrorKind::Network
            }
            CacheError::BadDigest { .. } => ppm_core::ErrorKind::BadDigest,
            CacheError::ResourceUnavailable { .. } => ppm_core::ErrorKind::NotFound,
            CacheError::Io { .. } => ppm_core::ErrorKind::Io,
        };
        ppm_core::Error::new(kind, err.to_string())
    }
}
