//! The plain, already-resolved configuration the core is handed.
//!
//! Nothing downstream of [`PrefixConfig`] parses YAML or reads
//! environment variables; that happens once, here, before the index is
//! loaded or a transaction begins (spec §5 "Global configuration").

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One configured remote repository, in priority order (earlier wins
/// on a name collision across repos, spec §4.2).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryConfig {
    pub name: String,
    pub url: String,
}

/// Fully-resolved settings for a single prefix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrefixConfig {
    pub prefix_root: PathBuf,
    pub repositories: Vec<RepositoryConfig>,
    pub cache_dir: Option<PathBuf>,
    #[serde(default)]
    pub assume_yes: bool,
}

impl PrefixConfig {
    #[must_use]
    pub fn new(prefix_root: impl Into<PathBuf>) -> Self {
        Self {
            prefix_root: prefix_root.into(),
            repositories: Vec::new(),
            cache_dir: None,
            assume_yes: false,
        }
    }

    /// The directory the content-addressed cache (C2) writes into:
    /// the override if set, otherwise `<prefix>/var/cache/mmpack/pkgs`.
    #[must_use]
    pub fn effective_cache_dir(&self) -> PathBuf {
        self.cache_dir
            .clone()
            .unwrap_or_else(|| self.prefix_root.join("var/cache/mmpack/pkgs"))
    }

    #[must_use]
    pub fn prefix_local_config_path(&self) -> PathBuf {
        self.prefix_root.join("etc/mmpack-config.yaml")
    }
}

/// Overrides coming from the command line, applied last (highest
/// priority, matching the hierarchy a prefix-local file sits under).
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub cache_dir: Option<PathBuf>,
    pub assume_yes: bool,
}

impl CliOverrides {
    pub fn apply_to(&self, config: &mut PrefixConfig) {
        if let Some(ref dir) = self.cache_dir {
            config.cache_dir = Some(dir.clone());
        }
        if self.assume_yes {
            config.assume_yes = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_cache_dir_is_under_prefix() {
        let config = PrefixConfig::new("/opt/myprefix");
        assert_eq!(
            config.effective_cache_dir(),
            PathBuf::from("/opt/myprefix/var/cache/mmpack/pkgs")
        );
    }

    #[test]
    fn cache_dir_override_wins() {
        let mut config = PrefixConfig::new("/opt/myprefix");
        config.cache_dir = Some(PathBuf::from("/tmp/shared-cache"));
        assert_eq!(config.effective_cache_dir(), PathBuf::from("/tmp/shared-cache"));
    }

    #[test]
    fn cli_overrides_apply() {
        let mut config = PrefixConfig::new("/opt/myprefix");
        let overrides = CliOverrides {
            cache_dir: Some(PathBuf::from("/tmp/cache")),
            assume_yes: true,
        };
        overrides.apply_to(&mut config);
        assert_eq!(config.cache_dir, Some(PathBuf::from("/tmp/cache")));
        assert!(config.assume_yes);
    }
}
