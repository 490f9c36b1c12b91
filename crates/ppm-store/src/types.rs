//! The set of installed packages and their per-file integrity records
//! (spec §3, C6), grounded on `struct install_state` /
//! `install_state_add()` / `install_state_remove()` /
//! `install_state_fill_lookup_table()`.

use ppm_core::{Digest256, TypedHash, Version};
use ppm_index::DepSpec;
use std::collections::HashMap;

/// One package's currently-installed state: the full record carried
/// over from the index entry it was installed from (spec §6: the
/// installed-list format is the same block key-value as a repository
/// index, minus `filename`/`sha256`/`size`), plus the path-to-typed-hash
/// map from its sum-file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledPackage {
    pub name: String,
    pub version: Version,
    pub source_name: String,
    pub source_digest: Digest256,
    pub sum_digest: Digest256,
    pub description: String,
    pub ghost: bool,
    pub mmpack_deps: Vec<DepSpec>,
    pub sys_deps: Vec<String>,
    /// `path relative to the prefix root -> typed hash of that entry`.
    pub files: Vec<(String, TypedHash)>,
}

/// The set of every package currently installed in a prefix, plus the
/// subset the user asked for explicitly (as opposed to pulled in only
/// as a dependency) — mirrors `struct install_state` and the separate
/// manually-installed list mmpack keeps alongside it.
#[derive(Debug, Clone, Default)]
pub struct InstallState {
    packages: Vec<InstalledPackage>,
    manually_installed: Vec<String>,
}

impl InstallState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fast name -> index lookup table, rebuilt on demand (mirrors
    /// `install_state_fill_lookup_table()`, which the original keeps
    /// as a side table rather than a persistent map to avoid paying
    /// for it when the state is only read once).
    #[must_use]
    pub fn lookup_table(&self) -> HashMap<&str, usize> {
        self.packages
            .iter()
            .enumerate()
            .map(|(i, p)| (p.name.as_str(), i))
            .collect()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&InstalledPackage> {
        self.packages.iter().find(|p| p.name == name)
    }

    #[must_use]
    pub fn is_installed(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    #[must_use]
    pub fn is_manually_installed(&self, name: &str) -> bool {
        self.manually_installed.iter().any(|n| n == name)
    }

    /// Add or replace a package's installed record.
    pub fn add(&mut self, pkg: InstalledPackage) {
        if let Some(existing) = self.packages.iter_mut().find(|p| p.name == pkg.name) {
            *existing = pkg;
        } else {
            self.packages.push(pkg);
        }
    }

    /// Remove a package's installed record; returns it if present.
    pub fn remove(&mut self, name: &str) -> Option<InstalledPackage> {
        let idx = self.packages.iter().position(|p| p.name == name)?;
        self.manually_installed.retain(|n| n != name);
        Some(self.packages.remove(idx))
    }

    /// Mark `name` as explicitly requested by the user, independent of
    /// whether it is also a dependency of something else.
    pub fn mark_manually_installed(&mut self, name: &str) {
        if !self.is_manually_installed(name) {
            self.manually_installed.push(name.to_string());
        }
    }

    pub fn unmark_manually_installed(&mut self, name: &str) {
        self.manually_installed.retain(|n| n != name);
    }

    #[must_use]
    pub fn manually_installed(&self) -> &[String] {
        &self.manually_installed
    }

    pub fn iter(&self) -> impl Iterator<Item = &InstalledPackage> {
        self.packages.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.packages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// Packages that are installed but were never explicitly requested
    /// and are no longer a dependency of anything that is (spec §9.1,
    /// `mmpack autoremove`'s input set). `still_needed` is the set of
    /// names still reachable from the manually-installed roots.
    #[must_use]
    pub fn orphaned<'a>(&'a self, still_needed: &[&str]) -> Vec<&'a str> {
        self.packages
            .iter()
            .map(|p| p.name.as_str())
            .filter(|name| !self.is_manually_installed(name) && !still_needed.contains(name))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pkg(name: &str) -> InstalledPackage {
        InstalledPackage {
            name: name.to_string(),
            version: Version::new("1.0.0"),
            source_name: name.to_string(),
            source_digest: Digest256::from_hex("a".repeat(64)),
            sum_digest: Digest256::from_hex("b".repeat(64)),
            description: String::new(),
            ghost: false,
            mmpack_deps: vec![],
            sys_deps: vec![],
            files: vec![],
        }
    }

    #[test]
    fn add_replaces_existing_entry_for_same_name() {
        let mut state = InstallState::new();
        state.add(pkg("foo"));
        let mut updated = pkg("foo");
        updated.version = Version::new("2.0.0");
        state.add(updated);

        assert_eq!(state.len(), 1);
        assert_eq!(state.get("foo").unwrap().version.as_str(), "2.0.0");
    }

    #[test]
    fn remove_clears_manual_flag_too() {
        let mut state = InstallState::new();
        state.add(pkg("foo"));
        state.mark_manually_installed("foo");

        state.remove("foo");
        assert!(!state.is_installed("foo"));
        assert!(!state.is_manually_installed("foo"));
    }

    #[test]
    fn orphaned_excludes_manual_and_still_needed() {
        let mut state = InstallState::new();
        state.add(pkg("app"));
        state.add(pkg("libfoo"));
        state.add(pkg("libunused"));
        state.mark_manually_installed("app");

        let orphaned = state.orphaned(&["libfoo"]);
        assert_eq!(orphaned, vec!["libunused"]);
    }
}
