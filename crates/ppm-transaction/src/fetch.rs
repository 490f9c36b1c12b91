//! Step 2 of §4.7: resolve every INSTALL/UPGRADE target's archive via
//! the content-addressed cache (C2) before any filesystem mutation.

use crate::types::StagedAction;
use ppm_cache::{Cache, RemoteFetcher};
use ppm_core::Result;

/// Populate `staged_archive_path` on every INSTALL/UPGRADE action.
/// A fetch failure (network, digest mismatch) aborts before anything
/// has been written to the prefix.
pub fn fetch_all<F: RemoteFetcher>(
    actions: &mut [StagedAction<'_>],
    cache: &Cache<F>,
) -> Result<()> {
    for action in actions {
        match action {
            StagedAction::Install {
                pkg,
                staged_archive_path,
            } => {
                *staged_archive_path = Some(cache.fetch(pkg)?);
            }
            StagedAction::Upgrade {
                new,
                staged_archive_path,
                ..
            } => {
                *staged_archive_path = Some(cache.fetch(new)?);
            }
            StagedAction::Remove { .. } => {}
        }
    }
    Ok(())
}
