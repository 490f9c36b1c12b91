//! Environment variable overrides, applied between the prefix-local
//! YAML file and CLI flags (spec §5 configuration hierarchy).

use std::path::PathBuf;

#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    pub cache_dir: Option<PathBuf>,
    pub assume_yes: bool,
}

impl EnvOverrides {
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            cache_dir: std::env::var_os("MMPACK_CACHE_DIR").map(PathBuf::from),
            assume_yes: std::env::var_os("MMPACK_ASSUME_YES").is_some(),
        }
    }

    pub fn apply_to(&self, config: &mut crate::types::PrefixConfig) {
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
    use crate::types::PrefixConfig;

    #[test]
    fn empty_overrides_leave_config_untouched() {
        let mut config = PrefixConfig::new("/opt/prefix");
        let original = config.clone();
        EnvOverrides::default().apply_to(&mut config);
        assert_eq!(config, original);
    }

    #[test]
    fn cache_dir_override_applies() {
        let mut config = PrefixConfig::new("/opt/prefix");
        let overrides = EnvOverrides { cache_dir: Some(PathBuf::from("/tmp/c")), assume_yes: false };
        overrides.apply_to(&mut config);
        assert_eq!(config.cache_dir, Some(PathBuf::from("/tmp/c")));
    }
}
