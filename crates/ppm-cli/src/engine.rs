//! Wires the engine crates together for one invocation: load config,
//! fetch and index every configured repository, load the prefix's
//! install state.

use anyhow::{Context, Result};
use ppm_cache::{Cache, HttpFetcher, RemoteFetcher};
use ppm_config::PrefixConfig;
use ppm_index::{parse_index, parse_installed_list, BinaryIndex, PackageRecord};
use ppm_store::InstallState;
use tracing::{debug, warn};

pub struct Engine {
    pub config: PrefixConfig,
    pub index: BinaryIndex,
    pub state: InstallState,
}

impl Engine {
    pub fn load(config: PrefixConfig) -> Result<Self> {
        let fetcher = HttpFetcher::new().context("building HTTP client")?;
        let mut index = BinaryIndex::new();

        // Load the prefix's own installed-list first (spec §4.3, §8):
        // inserting it ahead of the repo indices means each repo's
        // matching (version, sum_digest) record merges into it rather
        // than the other way around, carrying the installed record's
        // dependency/description fields forward with the repo's
        // remote_resources attached.
        let installed_list_path = config.prefix_root.join("var/lib/mmpack/installed.yaml");
        if installed_list_path.exists() {
            let bytes = std::fs::read(&installed_list_path)
                .with_context(|| format!("reading {}", installed_list_path.display()))?;
            let records = parse_installed_list(&bytes).with_context(|| {
                format!("parsing installed-list {}", installed_list_path.display())
            })?;
            for record in records {
                index.insert(record);
            }
        }

        for repo in &config.repositories {
            debug!(name = %repo.name, url = %repo.url, "fetching repository index");
            let bytes = fetcher
                .fetch(&repo.url)
                .with_context(|| format!("fetching index for repository '{}'", repo.name))?;
            let records = parse_index(&repo.url, &bytes)
                .with_context(|| format!("parsing index for repository '{}'", repo.name))?;
            for record in records {
                index.insert(record);
            }
        }

        let unmet = index.compute_rdepends();
        for name in &unmet {
            warn!(name, "dependency referenced but not found in any configured repository");
        }

        let state = ppm_store::load(&config.prefix_root).context("loading install state")?;

        Ok(Self { config, index, state })
    }

    pub fn cache(&self) -> Result<Cache<HttpFetcher>> {
        let fetcher = HttpFetcher::new().context("building HTTP client")?;
        Ok(Cache::new(self.config.effective_cache_dir(), fetcher))
    }

    /// Resolve every currently-installed package's name/version against
    /// the freshly-loaded index, so the solver works from the same
    /// `&PackageRecord` references it would plan with. A package
    /// installed from a version no longer advertised by any configured
    /// repository is skipped with a warning; the solver simply never
    /// sees it as a candidate to keep satisfied.
    pub fn installed_refs(&self) -> Vec<&PackageRecord> {
        installed_refs(&self.index, &self.state)
    }
}

/// Resolve every currently-installed package's name/version against the
/// freshly-loaded index, so the solver works from the same `&PackageRecord`
/// references it would plan with. A package installed from a version no
/// longer advertised by any configured repository is skipped with a
/// warning; the solver simply never sees it as a candidate to keep
/// satisfied.
///
/// Free function (rather than an `&self` method) so the returned
/// references borrow only `index`, not the whole `Engine` — callers can
/// still mutate `engine.state` while a plan computed from this list is
/// alive.
pub fn installed_refs<'idx>(index: &'idx BinaryIndex, state: &InstallState) -> Vec<&'idx PackageRecord> {
    state
        .iter()
        .filter_map(|installed| {
            let id = index.name_id(&installed.name)?;
            let found = index
                .packages_of(id)
                .iter()
                .find(|p| p.version == installed.version);
            if found.is_none() {
                warn!(
                    name = %installed.name,
                    version = %installed.version.as_str(),
                    "installed version no longer present in any configured repository"
                );
            }
            found
        })
        .collect()
}
