//! Sanity checks on a loaded [`PrefixConfig`] before it is handed to the
//! index loader or the applier.

use crate::error::{ConfigError, Result};
use crate::types::PrefixConfig;
use std::collections::HashSet;

pub fn validate(config: &PrefixConfig) -> Result<()> {
    if !config.prefix_root.is_absolute() {
        return Err(ConfigError::invalid(format!(
            "prefix root must be an absolute path, got {}",
            config.prefix_root.display()
        )));
    }

    if config.repositories.is_empty() {
        return Err(ConfigError::invalid("no repositories configured"));
    }

    let mut seen = HashSet::new();
    for repo in &config.repositories {
        if repo.name.is_empty() {
            return Err(ConfigError::invalid("repository name cannot be empty"));
        }
        if repo.url.is_empty() {
            return Err(ConfigError::invalid(format!(
                "repository '{}' has an empty url",
                repo.name
            )));
        }
        if !seen.insert(repo.name.as_str()) {
            return Err(ConfigError::invalid(format!(
                "repository name '{}' is configured more than once",
                repo.name
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RepositoryConfig;

    fn repo(name: &str, url: &str) -> RepositoryConfig {
        RepositoryConfig { name: name.into(), url: url.into() }
    }

    #[test]
    fn rejects_relative_prefix_root() {
        let mut config = PrefixConfig::new("relative/path");
        config.repositories.push(repo("main", "https://example.org/repo"));
        assert!(validate(&config).is_err());
    }

    #[test]
    fn rejects_empty_repository_list() {
        let config = PrefixConfig::new("/opt/prefix");
        assert!(validate(&config).is_err());
    }

    #[test]
    fn rejects_duplicate_repository_names() {
        let mut config = PrefixConfig::new("/opt/prefix");
        config.repositories.push(repo("main", "https://a.example.org"));
        config.repositories.push(repo("main", "https://b.example.org"));
        assert!(validate(&config).is_err());
    }

    #[test]
    fn accepts_well_formed_config() {
        let mut config = PrefixConfig::new("/opt/prefix");
        config.repositories.push(repo("main", "https://example.org/repo"));
        assert!(validate(&config).is_ok());
    }
}
