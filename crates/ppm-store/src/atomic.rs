//! Crash-safe file writes: write to a temp file, verify its digest,
//! back up the previous version, then rename into place.
//!
//! Grounded on the teacher's `AtomicWriter`, trimmed to the single-
//! threaded, single-process setting the core runs in (spec §5): no
//! cross-process file locking, since only one transaction applier ever
//! touches a prefix at a time.

use crate::error::{Result, StoreError};
use ppm_core::Digest256;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Write `content` to `target` atomically, keeping a `.backup` copy of
/// whatever was there before.
pub fn write_atomic(target: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
    }

    let temp_path = sibling(target, "tmp");
    let expected = Digest256::of_bytes(content);

    {
        let mut temp_file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)
            .map_err(|e| StoreError::io(&temp_path, e))?;
        temp_file
            .write_all(content)
            .map_err(|e| StoreError::io(&temp_path, e))?;
        temp_file
            .sync_all()
            .map_err(|e| StoreError::io(&temp_path, e))?;
    }

    let actual =
        Digest256::of_file(&temp_path).map_err(|e| StoreError::io(&temp_path, std::io::Error::other(e.to_string())))?;
    if actual != expected {
        let _ = fs::remove_file(&temp_path);
        return Err(StoreError::malformed(
            target,
            "temp file digest mismatch after write",
        ));
    }

    if target.exists() {
        let backup_path = sibling(target, "backup");
        fs::copy(target, &backup_path).map_err(|e| StoreError::io(&backup_path, e))?;
        debug!(backup = %backup_path.display(), "wrote backup");
    }

    fs::rename(&temp_path, target).map_err(|e| StoreError::io(target, e))?;

    #[cfg(unix)]
    if let Some(parent) = target.parent() {
        if let Ok(dir) = File::open(parent) {
            let _ = dir.sync_all();
        }
    }

    Ok(())
}

fn sibling(target: &Path, suffix: &str) -> PathBuf {
    let mut name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.push('.');
    name.push_str(suffix);
    target.with_file_name(name)
}

/// Remove any orphaned `.tmp` file left behind by an interrupted write
/// to `target` (spec §4.6: the applier must be safe to re-run after a
/// crash).
pub fn clean_orphaned_temp(target: &Path) {
    let temp_path = sibling(target, "tmp");
    if temp_path.exists() {
        warn!(path = %temp_path.display(), "removing orphaned temp file");
        let _ = fs::remove_file(&temp_path);
    }
}
