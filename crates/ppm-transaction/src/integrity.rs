//! §4.8: per-package integrity check and the "fix broken" repair path
//! that re-runs a failing package through the INSTALL branch of the
//! applier.

use crate::apply::Applier;
use crate::types::{IntegrityReport, IntegrityStatus};
use ppm_cache::{Cache, RemoteFetcher};
use ppm_core::{Error, Result, TypedHash};
use ppm_index::BinaryIndex;
use ppm_store::InstallState;
use std::path::Path;

/// Recompute every installed file's hash and compare against the
/// sum-file recorded at install time. `filter` narrows the check to
/// one package name; `None` means "all" (spec §4.8).
#[must_use]
pub fn check_installed(prefix_root: &Path, state: &InstallState, filter: Option<&str>) -> Vec<IntegrityReport> {
    state
        .iter()
        .filter(|pkg| filter.is_none_or(|name| name == pkg.name))
        .map(|pkg| {
            let mut bad_paths = Vec::new();
            for (path, expected) in &pkg.files {
                let full = prefix_root.join(path);
                match TypedHash::of_path(&full) {
                    Ok(actual) if &actual == expected => {}
                    _ => bad_paths.push(path.clone()),
                }
            }
            let status = if bad_paths.is_empty() {
                IntegrityStatus::Ok
            } else {
                IntegrityStatus::Fail { bad_paths }
            };
            IntegrityReport {
                name: pkg.name.clone(),
                status,
            }
        })
        .collect()
}

/// Reinstall every name in `failing` over itself, using the index to
/// find its currently-installed version's record (spec §4.8: "fix
/// broken" reruns the INSTALL path of C9).
pub fn fix_broken<F: RemoteFetcher>(
    prefix_root: &Path,
    state: InstallState,
    index: &BinaryIndex,
    cache: &Cache<F>,
    failing: &[String],
) -> Result<InstallState> {
    let mut applier = Applier::new(prefix_root, state);

    for name in failing {
        let installed = applier
            .installed_version(name)
            .ok_or_else(|| Error::not_found(format!("package '{name}' is not installed")))?;
        let record = index
            .packages_of(
                index
                    .name_id(name)
                    .ok_or_else(|| Error::not_found(format!("unknown package: {name}")))?,
            )
            .iter()
            .find(|p| p.version == installed)
            .ok_or_else(|| {
                Error::not_found(format!(
                    "installed version of '{name}' is no longer in the index"
                ))
            })?;

        let archive = cache.fetch(record)?;
        applier.reinstall(record, &archive)?;
    }

    Ok(applier.into_state())
}
