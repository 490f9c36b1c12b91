//! Error type for configuration loading and validation.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid YAML in {}: {source}", path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid configuration: {message}")]
    Invalid { message: String },
}

impl ConfigError {
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }

    #[must_use]
    pub fn yaml(path: impl Into<PathBuf>, source: serde_yaml::Error) -> Self {
        Self::Yaml { path: path.into(), source }
    }

    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid { message: message.into() }
    }
}

impl From<ConfigError> for ppm_core::Error {
    fn from(err: ConfigError) -> Self {
        let kind = match &err {
            ConfigError::Io { .. } => ppm_core::ErrorKind::Io,
            ConfigError::Yaml { .. } => ppm_core::ErrorKind::BadFormat,
            ConfigError::Invalid { .. } => ppm_core::ErrorKind::BadFormat,
        };
        ppm_core::Error::new(kind, err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;
