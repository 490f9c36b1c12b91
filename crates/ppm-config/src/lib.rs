//! Prefix configuration: a thin, already-resolved pass-through the
//! core never parses YAML or reads the environment itself (spec §5
//! "Global configuration", Non-goal "configuration-file parsing").

#![warn(clippy::all)]

mod env;
mod error;
mod loader;
mod types;
mod validate;

pub use env::EnvOverrides;
pub use error::{ConfigError, Result};
pub use loader::ConfigLoader;
pub use types::{CliOverrides, PrefixConfig, RepositoryConfig};
pub use validate::validate;
