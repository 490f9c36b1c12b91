//! Error taxonomy shared by every `ppm` crate.
//!
//! Every fallible operation in the core returns one of the kinds listed
//! below (see spec §7): parsing/solving/applying code never panics on
//! malformed input, and the applier treats the first failure as
//! stop-of-transaction rather than attempting local recovery.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// The error kinds every `ppm` crate's local `Error` type is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Malformed index, archive, or sum-file.
    BadFormat,
    /// Requested package name absent from the index, or file absent.
    NotFound,
    /// The solver could not produce a plan.
    Unsatisfiable,
    /// The user requested two incompatible version constraints at once.
    VersionConflict,
    /// Fetched or on-disk content failed its hash check.
    BadDigest,
    /// The system-package probe reported an unmet dependency.
    MissingSysdep,
    /// Transport failure talking to a remote repository.
    Network,
    /// Filesystem error during extraction, rename, or unlink.
    Io,
    /// An internal invariant was violated.
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::BadFormat => "BAD_FORMAT",
            Self::NotFound => "NOT_FOUND",
            Self::Unsatisfiable => "UNSATISFIABLE",
            Self::VersionConflict => "VERSION_CONFLICT",
            Self::BadDigest => "BAD_DIGEST",
            Self::MissingSysdep => "MISSING_SYSDEP",
            Self::Network => "NETWORK",
            Self::Io => "IO",
            Self::Internal => "INTERNAL",
        };
        f.write_str(s)
    }
}

/// The error type shared by every `ppm` crate.
#[derive(Debug, Error)]
#[error("[{kind}] {message}")]
pub struct Error {
    kind: ErrorKind,
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl Error {
    /// Build a new error of the given kind with a human-readable message.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Attach an underlying cause to this error.
    #[must_use]
    pub fn with_source(
        mut self,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// The error kind, for callers that branch on failure category.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Shorthand for [`ErrorKind::NotFound`].
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Shorthand for [`ErrorKind::BadFormat`].
    pub fn bad_format(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadFormat, message)
    }

    /// Shorthand for [`ErrorKind::BadDigest`].
    pub fn bad_digest(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadDigest, message)
    }

    /// Shorthand for [`ErrorKind::Internal`], used for asserted invariants.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Wrap an [`std::io::Error`] encountered while touching `path`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        Self::new(ErrorKind::Io, format!("{}: {source}", path.display())).with_source(source)
    }
}

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Self::new(ErrorKind::Io, source.to_string()).with_source(source)
    }
}

/// Convenience alias used throughout the `ppm` workspace.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_display_matches_spec_tokens() {
        assert_eq!(ErrorKind::BadFormat.to_string(), "BAD_FORMAT");
        assert_eq!(ErrorKind::Unsatisfiable.to_string(), "UNSATISFIABLE");
        assert_eq!(ErrorKind::MissingSysdep.to_string(), "MISSING_SYSDEP");
    }

    #[test]
    fn error_carries_kind_through_display() {
        let err = Error::not_found("package 'foo' not found");
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(err.to_string().contains("NOT_FOUND"));
    }
}
