//! Hierarchical loader: defaults, then the prefix-local YAML file
//! (spec §6 `etc/mmpack-config.yaml`, "optional override of user
//! config"), then environment variables, then CLI flags. Each layer
//! only overrides what it sets.

use crate::env::EnvOverrides;
use crate::error::{ConfigError, Result};
use crate::types::{CliOverrides, PrefixConfig, RepositoryConfig};
use crate::validate;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    #[serde(default)]
    repositories: Vec<RepositoryConfig>,
    cache_dir: Option<PathBuf>,
    assume_yes: Option<bool>,
}

pub struct ConfigLoader {
    prefix_root: PathBuf,
}

impl ConfigLoader {
    #[must_use]
    pub fn new(prefix_root: impl Into<PathBuf>) -> Self {
        Self { prefix_root: prefix_root.into() }
    }

    /// Load and merge every layer, without validating the result.
    pub fn load(&self) -> Result<PrefixConfig> {
        let mut config = PrefixConfig::new(&self.prefix_root);

        if let Some(file) = self.load_prefix_local_config()? {
            apply_file(&mut config, file);
        }

        EnvOverrides::from_env().apply_to(&mut config);
        Ok(config)
    }

    /// Load every layer, apply CLI overrides last, then validate.
    pub fn load_with_overrides(&self, cli: &CliOverrides) -> Result<PrefixConfig> {
        let mut config = self.load()?;
        cli.apply_to(&mut config);
        validate::validate(&config)?;
        Ok(config)
    }

    fn load_prefix_local_config(&self) -> Result<Option<FileConfig>> {
        let path = self.prefix_local_path();
        match std::fs::read_to_string(&path) {
            Ok(contents) => {
                let file = serde_yaml::from_str(&contents).map_err(|e| ConfigError::yaml(&path, e))?;
                Ok(Some(file))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ConfigError::io(&path, e)),
        }
    }

    fn prefix_local_path(&self) -> PathBuf {
        PrefixConfig::new(&self.prefix_root).prefix_local_config_path()
    }
}

fn apply_file(config: &mut PrefixConfig, file: FileConfig) {
    if !file.repositories.is_empty() {
        config.repositories = file.repositories;
    }
    if let Some(dir) = file.cache_dir {
        config.cache_dir = Some(dir);
    }
    if let Some(assume_yes) = file.assume_yes {
        config.assume_yes = assume_yes;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn missing_prefix_local_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loader = ConfigLoader::new(dir.path());
        let config = loader.load().unwrap();
        assert!(config.repositories.is_empty());
    }

    #[test]
    fn prefix_local_file_overrides_repositories() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("etc")).unwrap();
        fs::write(
            dir.path().join("etc/mmpack-config.yaml"),
            "repositories:\n  - name: main\n    url: https://example.org/repo\ncache_dir: /tmp/custom-cache\n",
        )
        .unwrap();

        let loader = ConfigLoader::new(dir.path());
        let config = loader.load().unwrap();
        assert_eq!(config.repositories.len(), 1);
        assert_eq!(config.repositories[0].name, "main");
        assert_eq!(config.cache_dir, Some(PathBuf::from("/tmp/custom-cache")));
    }

    #[test]
    fn load_with_overrides_validates() {
        let dir = tempfile::tempdir().unwrap();
        let loader = ConfigLoader::new(dir.path());
        let err = loader.load_with_overrides(&CliOverrides::default());
        assert!(err.is_err(), "no repositories configured should fail validation");
    }
}
