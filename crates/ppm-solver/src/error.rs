//! Error type for the dependency solver.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SolverError {
    /// The backtracking search exhausted every decision without
    /// finding a plan that satisfies all declared dependencies.
    #[error("no install plan satisfies the requested constraints")]
    Unsatisfiable,

    /// The user's own request named two incompatible constraints on
    /// the same package in one call.
    #[error("conflicting version constraints requested for {name}")]
    VersionConflict { name: String },

    /// A requested package name is not present in the index at all.
    #[error("unknown package: {name}")]
    NotFound { name: String },
}

impl From<SolverError> for ppm_core::Error {
    fn from(err: SolverError) -> Self {
        let kind = match err {
            SolverError::Unsatisfiable => ppm_core::ErrorKind::Unsatisfiable,
            SolverError::VersionConflict { .. } => ppm_core::ErrorKind::VersionConflict,
            SolverError::NotFound { .. } => ppm_core::ErrorKind::NotFound,
        };
        ppm_core::Error::new(kind, err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SolverError>;
