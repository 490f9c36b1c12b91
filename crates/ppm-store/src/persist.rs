//! On-disk layout of a prefix's install state (spec §3, §4.6, §6, C6).
//!
//! ```text
//! <prefix>/var/lib/mmpack/installed.yaml              key-value blocks, one per package
//! <prefix>/var/lib/mmpack/manually-installed.txt      name, one per line
//! <prefix>/var/lib/mmpack/metadata/<name>.sha256sums  "<path> : <typed-hash>" per line
//! ```
//!
//! `installed.yaml` uses the same block key-value format as a
//! repository index, minus the `filename`/`sha256`/`size` fields (spec
//! §6) — [`ppm_index::format_installed_record`]/[`ppm_index::parse_installed_list`]
//! own that format; this module only owns the file layout around it.
//! All three are written with [`crate::atomic::write_atomic`] and only
//! ever rewritten in full at the end of a transaction (spec §5: the
//! store is not updated incrementally mid-transaction).

use crate::atomic::write_atomic;
use crate::error::{Result, StoreError};
use crate::types::{InstallState, InstalledPackage};
use ppm_core::TypedHash;
use ppm_index::PackageRecord;
use std::fs;
use std::path::{Path, PathBuf};

fn installed_path(root: &Path) -> PathBuf {
    root.join("var/lib/mmpack/installed.yaml")
}

fn manually_installed_path(root: &Path) -> PathBuf {
    root.join("var/lib/mmpack/manually-installed.txt")
}

fn sum_path(root: &Path, name: &str) -> PathBuf {
    root.join("var/lib/mmpack/metadata")
        .join(format!("{name}.sha256sums"))
}

fn record_to_installed(record: PackageRecord, files: Vec<(String, TypedHash)>) -> InstalledPackage {
    InstalledPackage {
        name: record.name,
        version: record.version,
        source_name: record.source_name,
        source_digest: record.source_digest,
        sum_digest: record.sum_digest,
        description: record.description,
        ghost: record.ghost,
        mmpack_deps: record.mmpack_deps,
        sys_deps: record.sys_deps,
        files,
    }
}

fn installed_to_record(pkg: &InstalledPackage) -> PackageRecord {
    PackageRecord {
        name: pkg.name.clone(),
        name_id: u32::MAX,
        version: pkg.version.clone(),
        source_name: pkg.source_name.clone(),
        source_digest: pkg.source_digest.clone(),
        sum_digest: pkg.sum_digest.clone(),
        description: pkg.description.clone(),
        ghost: pkg.ghost,
        mmpack_deps: pkg.mmpack_deps.clone(),
        sys_deps: pkg.sys_deps.clone(),
        remote_resources: Vec::new(),
    }
}

/// Load the install state rooted at `prefix_root`. A prefix with no
/// state files yet is a valid, empty state (a fresh prefix).
pub fn load(prefix_root: &Path) -> Result<InstallState> {
    let mut state = InstallState::new();

    let installed = installed_path(prefix_root);
    if installed.exists() {
        let bytes = fs::read(&installed).map_err(|e| StoreError::io(&installed, e))?;
        let records = ppm_index::parse_installed_list(&bytes)
            .map_err(|e| StoreError::malformed(&installed, e.to_string()))?;
        for record in records {
            let name = record.name.clone();
            let files = load_sum_file(prefix_root, &name)?;
            state.add(record_to_installed(record, files));
        }
    }

    let manual = manually_installed_path(prefix_root);
    if manual.exists() {
        let text = fs::read_to_string(&manual).map_err(|e| StoreError::io(&manual, e))?;
        for line in text.lines().filter(|l| !l.trim().is_empty()) {
            state.mark_manually_installed(line.trim());
        }
    }

    Ok(state)
}

fn load_sum_file(prefix_root: &Path, name: &str) -> Result<Vec<(String, TypedHash)>> {
    let path = sum_path(prefix_root, name);
    if !path.exists() {
        return Ok(Vec::new());
    }
    let text = fs::read_to_string(&path).map_err(|e| StoreError::io(&path, e))?;
    text.lines()
        .filter(|l| !l.trim().is_empty())
        .map(|line| {
            let (file_path, hash) = line
                .split_once(" : ")
                .ok_or_else(|| StoreError::malformed(&path, format!("bad line: {line}")))?;
            let typed = TypedHash::parse(hash.trim())
                .map_err(|e| StoreError::malformed(&path, e.to_string()))?;
            Ok((file_path.to_string(), typed))
        })
        .collect()
}

/// Persist the full install state back to `prefix_root`, overwriting
/// whatever was there.
pub fn save(prefix_root: &Path, state: &InstallState) -> Result<()> {
    let mut installed_text = String::new();
    for pkg in state.iter() {
        if !installed_text.is_empty() {
            installed_text.push('\n');
        }
        installed_text.push_str(&ppm_index::format_installed_record(&installed_to_record(pkg)));

        save_sum_file(prefix_root, pkg)?;
    }
    write_atomic(&installed_path(prefix_root), installed_text.as_bytes())?;

    let manual_text = state
        .manually_installed()
        .iter()
        .map(|n| format!("{n}\n"))
        .collect::<String>();
    write_atomic(&manually_installed_path(prefix_root), manual_text.as_bytes())?;

    Ok(())
}

fn save_sum_file(prefix_root: &Path, pkg: &InstalledPackage) -> Result<()> {
    let mut text = String::new();
    for (path, hash) in &pkg.files {
        text.push_str(path);
        text.push_str(" : ");
        text.push_str(&hash.to_string());
        text.push('\n');
    }
    write_atomic(&sum_path(prefix_root, &pkg.name), text.as_bytes())
}

/// Remove a removed package's sum-file; `save` does not clean up files
/// for packages no longer present, since it only ever writes entries
/// that still exist.
pub fn remove_sum_file(prefix_root: &Path, name: &str) -> Result<()> {
    let path = sum_path(prefix_root, name);
    if path.exists() {
        fs::remove_file(&path).map_err(|e| StoreError::io(&path, e))?;
    }
    Ok(())
}
