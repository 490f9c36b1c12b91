//! Steps 3-5 of §4.7: extract/move/unlink per action, then one
//! post-process pass and a single persist at the end.
//!
//! Paths are resolved by joining against the prefix root rather than
//! `chdir`-ing the process (a deliberate deviation from the original's
//! literal `chdir`, documented in DESIGN.md): the on-disk result is
//! identical and the applier stays safe to exercise from parallel
//! `cargo test` processes.

use crate::types::StagedAction;
use ppm_archive::{extract, EntryType};
use ppm_core::{Error, Result, TypedHash};
use ppm_store::{InstallState, InstalledPackage};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, warn};

/// Carry a record's full metadata into the installed-state entry the
/// applier writes (spec §6: the installed-list persists most of a
/// repository record's fields), rather than just name/version.
fn installed_from_record(
    pkg: &ppm_index::PackageRecord,
    files: Vec<(String, TypedHash)>,
) -> InstalledPackage {
    InstalledPackage {
        name: pkg.name.clone(),
        version: pkg.version.clone(),
        source_name: pkg.source_name.clone(),
        source_digest: pkg.source_digest.clone(),
        sum_digest: pkg.sum_digest.clone(),
        description: pkg.description.clone(),
        ghost: pkg.ghost,
        mmpack_deps: pkg.mmpack_deps.clone(),
        sys_deps: pkg.sys_deps.clone(),
        files,
    }
}

/// One extracted, not-yet-final file: where it landed in scratch and
/// where it belongs once the archive has been fully read.
struct PendingMove {
    final_path: PathBuf,
    scratch_path: PathBuf,
}

/// Applies a staged action list against a prefix's install state.
/// Owns nothing about fetch/precheck; callers run those first.
pub struct Applier<'a> {
    prefix_root: &'a Path,
    state: InstallState,
    rm_dirs: BTreeSet<PathBuf>,
    newly_installed_py: Vec<PathBuf>,
    removed_py: Vec<PathBuf>,
    scratch_counter: u64,
}

impl<'a> Applier<'a> {
    #[must_use]
    pub fn new(prefix_root: &'a Path, state: InstallState) -> Self {
        Self {
            prefix_root,
            state,
            rm_dirs: BTreeSet::new(),
            newly_installed_py: Vec::new(),
            removed_py: Vec::new(),
            scratch_counter: 0,
        }
    }

    fn scratch_dir(&mut self) -> Result<PathBuf> {
        let dir = self
            .prefix_root
            .join("var/cache/mmpack/unpack")
            .join(self.scratch_counter.to_string());
        self.scratch_counter += 1;
        std::fs::create_dir_all(&dir).map_err(|e| Error::io(&dir, e))?;
        Ok(dir)
    }

    /// Run every action in commit order (spec §5: action-plan order is
    /// commit order), then the single post-process pass, then persist
    /// the updated install state. `requested` marks the names the user
    /// named directly, as opposed to names pulled in only as a
    /// dependency (spec §7: manually-installed bookkeeping).
    pub fn apply(&mut self, actions: &[StagedAction<'_>], requested: &[String]) -> Result<()> {
        for action in actions {
            match action {
                StagedAction::Install {
                    pkg,
                    staged_archive_path,
                } => {
                    let archive = staged_archive_path
                        .as_deref()
                        .ok_or_else(|| Error::internal("install action missing fetched archive"))?;
                    self.install(pkg, archive)?;
                }
                StagedAction::Upgrade {
                    old,
                    new,
                    staged_archive_path,
                } => {
                    let archive = staged_archive_path
                        .as_deref()
                        .ok_or_else(|| Error::internal("upgrade action missing fetched archive"))?;
                    self.upgrade(old, new, archive)?;
                }
                StagedAction::Remove { pkg } => self.remove(&pkg.name)?,
            }
        }

        for name in requested {
            self.state.mark_manually_installed(name);
        }

        self.post_process();
        ppm_store::save(self.prefix_root, &self.state)?;
        Ok(())
    }

    /// Extract `archive` to scratch, then rename every non-directory
    /// entry into its final place under the prefix (spec §4.7 step 3,
    /// INSTALL). Returns the per-file typed-hash manifest for the
    /// installed-state sum-file.
    fn extract_and_place(&mut self, archive: &Path) -> Result<Vec<(String, TypedHash)>> {
        let scratch = self.scratch_dir()?;
        let report = extract(archive, &scratch)?;

        let mut pending = Vec::new();
        for entry in &report.entries {
            if entry.kind == EntryType::Directory {
                continue;
            }
            pending.push(PendingMove {
                final_path: self.prefix_root.join(&entry.path),
                scratch_path: scratch.join(&entry.path),
            });
        }

        let mut files = Vec::with_capacity(pending.len());
        for mv in &pending {
            if let Some(parent) = mv.final_path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
            }
            std::fs::rename(&mv.scratch_path, &mv.final_path)
                .map_err(|e| Error::io(&mv.final_path, e))?;

            let hash = TypedHash::of_path(&mv.final_path)?;
            let relative = mv
                .final_path
                .strip_prefix(self.prefix_root)
                .unwrap_or(&mv.final_path)
                .to_string_lossy()
                .into_owned();

            if relative.ends_with(".py") {
                self.newly_installed_py.push(mv.final_path.clone());
            }
            files.push((relative, hash));
        }

        Ok(files)
    }

    /// The version currently recorded for `name`, if installed (used
    /// by [`crate::integrity::fix_broken`] to find the right index
    /// record to refetch).
    #[must_use]
    pub(crate) fn installed_version(&self, name: &str) -> Option<ppm_core::Version> {
        self.state.get(name).map(|p| p.version.clone())
    }

    /// Re-run the INSTALL branch over an already-installed package
    /// (spec §4.8 "fix broken"): extracting again overwrites whatever
    /// drifted on disk.
    pub(crate) fn reinstall(&mut self, pkg: &ppm_index::PackageRecord, archive: &Path) -> Result<()> {
        self.install(pkg, archive)
    }

    /// Consume the applier, returning its (possibly updated) install
    /// state. `apply` has already persisted it; this is for callers
    /// that want the in-memory state without reloading it (spec §9.1
    /// command flows that inspect state right after a transaction).
    #[must_use]
    pub fn into_state(self) -> InstallState {
        self.state
    }

    fn install(&mut self, pkg: &ppm_index::PackageRecord, archive: &Path) -> Result<()> {
        let files = self.extract_and_place(archive)?;
        self.state.add(installed_from_record(pkg, files));
        debug!(name = %pkg.name, version = %pkg.version.as_str(), "installed");
        Ok(())
    }

    fn remove(&mut self, name: &str) -> Result<()> {
        let Some(installed) = self.state.remove(name) else {
            return Ok(());
        };
        self.unlink_files(&installed);
        ppm_store::remove_sum_file(self.prefix_root, name)?;
        debug!(name, "removed");
        Ok(())
    }

    fn unlink_files(&mut self, installed: &InstalledPackage) {
        for (path, _hash) in &installed.files {
            let full = self.prefix_root.join(path);
            if let Some(parent) = full.parent() {
                self.rm_dirs.insert(parent.to_path_buf());
            }
            if path.ends_with(".py") {
                self.removed_py.push(full.clone());
            }
            unlink_tolerating_enoent(&full, "failed to unlink");
        }
    }

    fn upgrade(
        &mut self,
        old: &ppm_index::PackageRecord,
        new: &ppm_index::PackageRecord,
        archive: &Path,
    ) -> Result<()> {
        let mut rm_files: Vec<String> = self
            .state
            .get(&old.name)
            .map(|p| p.files.iter().map(|(path, _)| path.clone()).collect())
            .unwrap_or_default();

        let new_files = self.extract_and_place(archive)?;
        let installed_paths: BTreeSet<&str> =
            new_files.iter().map(|(path, _)| path.as_str()).collect();
        rm_files.retain(|path| !installed_paths.contains(path.as_str()));

        for path in &rm_files {
            let full = self.prefix_root.join(path);
            if let Some(parent) = full.parent() {
                self.rm_dirs.insert(parent.to_path_buf());
            }
            if path.ends_with(".py") {
                self.removed_py.push(full.clone());
            }
            unlink_tolerating_enoent(&full, "failed to unlink stale file");
        }

        self.state.add(installed_from_record(new, new_files));
        debug!(name = %new.name, from = %old.version.as_str(), to = %new.version.as_str(), "upgraded");
        Ok(())
    }

    /// Spec §4.7 step 4: rmdir emptied directories deepest-first,
    /// best-effort byte-compile new `.py` files, and drop cached
    /// `__pycache__` artefacts for removed ones.
    fn post_process(&mut self) {
        for dir in self.rm_dirs.iter().rev() {
            let _ = std::fs::remove_dir(dir);
        }

        if !self.newly_installed_py.is_empty() {
            compile_python(&self.newly_installed_py);
        }

        for py_path in &self.removed_py {
            clean_pycache(py_path);
        }
    }
}

/// Unlink `path`, tolerating `ENOENT` only (spec §4.7 step 3, REMOVE).
fn unlink_tolerating_enoent(path: &Path, context: &str) {
    if let Err(e) = std::fs::remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "{context}");
        }
    }
}

/// Feed every new `.py` file's path to an external interpreter's
/// stdin so it compiles them to `.pyc`. Best-effort: failures are
/// logged, never propagated (spec §4.7 step 4).
fn compile_python(paths: &[PathBuf]) {
    let mut child = match Command::new("python3")
        .arg("-m")
        .arg("py_compile")
        .stdin(Stdio::null())
        .args(paths)
        .spawn()
    {
        Ok(child) => child,
        Err(e) => {
            warn!(error = %e, "failed to spawn python3 for byte-compilation");
            return;
        }
    };
    if let Err(e) = child.wait() {
        warn!(error = %e, "python3 byte-compilation did not complete");
    }
}

/// Remove any compiled artefact for `py_path` under a sibling
/// `__pycache__/` directory.
fn clean_pycache(py_path: &Path) {
    let Some(parent) = py_path.parent() else {
        return;
    };
    let Some(stem) = py_path.file_stem().and_then(|s| s.to_str()) else {
        return;
    };
    let pycache = parent.join("__pycache__");
    let Ok(entries) = std::fs::read_dir(&pycache) else {
        return;
    };
    for entry in entries.flatten() {
        let name = entry.file_name();
        if name.to_string_lossy().starts_with(&format!("{stem}.")) {
            let _ = std::fs::remove_file(entry.path());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ppm_core::Version;
    use tempfile::tempdir;

    fn make_tar(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        for (path, content) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(content.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, path, *content).unwrap();
        }
        builder.into_inner().unwrap()
    }

    fn installed_pkg(name: &str, version: &str, files: Vec<(String, TypedHash)>) -> InstalledPackage {
        InstalledPackage {
            name: name.into(),
            version: Version::new(version),
            source_name: name.into(),
            source_digest: ppm_core::Digest256::from_hex("a".repeat(64)),
            sum_digest: ppm_core::Digest256::from_hex("b".repeat(64)),
            description: String::new(),
            ghost: false,
            mmpack_deps: vec![],
            sys_deps: vec![],
            files,
        }
    }

    fn record(name: &str, version: &str) -> ppm_index::PackageRecord {
        ppm_index::PackageRecord {
            name: name.into(),
            name_id: 0,
            version: Version::new(version),
            source_name: name.into(),
            source_digest: ppm_core::Digest256::from_hex("a".repeat(64)),
            sum_digest: ppm_core::Digest256::from_hex("b".repeat(64)),
            description: String::new(),
            ghost: false,
            mmpack_deps: vec![],
            sys_deps: vec![],
            remote_resources: vec![],
        }
    }

    #[test]
    fn install_extracts_and_registers_package() {
        let dir = tempdir().unwrap();
        let archive_path = dir.path().join("pkg.tar");
        let tar_bytes = make_tar(&[("bin/app", b"binary")]);
        std::fs::write(&archive_path, &tar_bytes).unwrap();

        let prefix = dir.path().join("prefix");
        std::fs::create_dir_all(&prefix).unwrap();
        let mut applier = Applier::new(&prefix, InstallState::new());

        let pkg = record("app", "1.0.0");
        applier.install(&pkg, &archive_path).unwrap();

        assert!(prefix.join("bin/app").exists());
        assert!(applier.state.is_installed("app"));
        assert_eq!(applier.state.get("app").unwrap().files.len(), 1);
    }

    #[test]
    fn remove_unlinks_files_and_deregisters() {
        let dir = tempdir().unwrap();
        let prefix = dir.path().join("prefix");
        std::fs::create_dir_all(prefix.join("bin")).unwrap();
        std::fs::write(prefix.join("bin/app"), b"binary").unwrap();

        let mut state = InstallState::new();
        state.add(installed_pkg(
            "app",
            "1.0.0",
            vec![(
                "bin/app".into(),
                TypedHash::of_path(&prefix.join("bin/app")).unwrap(),
            )],
        ));

        let mut applier = Applier::new(&prefix, state);
        applier.remove("app").unwrap();

        assert!(!prefix.join("bin/app").exists());
        assert!(!applier.state.is_installed("app"));
        assert!(applier.rm_dirs.contains(&prefix.join("bin")));
    }

    #[test]
    fn upgrade_drops_stale_files_not_reinstalled() {
        let dir = tempdir().unwrap();
        let prefix = dir.path().join("prefix");
        std::fs::create_dir_all(prefix.join("share")).unwrap();
        std::fs::write(prefix.join("share/old-only.txt"), b"stale").unwrap();

        let mut state = InstallState::new();
        state.add(installed_pkg(
            "app",
            "1.0.0",
            vec![(
                "share/old-only.txt".into(),
                TypedHash::of_path(&prefix.join("share/old-only.txt")).unwrap(),
            )],
        ));

        let archive_path = dir.path().join("new.tar");
        let tar_bytes = make_tar(&[("share/new.txt", b"fresh")]);
        std::fs::write(&archive_path, &tar_bytes).unwrap();

        let mut applier = Applier::new(&prefix, state);
        let old = record("app", "1.0.0");
        let new = record("app", "2.0.0");
        applier.upgrade(&old, &new, &archive_path).unwrap();

        assert!(!prefix.join("share/old-only.txt").exists());
        assert!(prefix.join("share/new.txt").exists());
        assert_eq!(applier.state.get("app").unwrap().version.as_str(), "2.0.0");
    }
}
