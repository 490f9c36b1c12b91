//! The binary index: every package known from every configured
//! repository, keyed by dense integer name ids for O(1) lookups (spec
//! C5), grounded on `struct binindex` / `binindex_add_pkg()` /
//! `binindex_compute_rdepends()`.

use crate::package::PackageRecord;
use ppm_core::version;
use std::cmp::Ordering;
use std::collections::HashMap;

/// All packages sharing one name, kept sorted by descending version,
/// plus the set of other names that depend on this one.
#[derive(Debug, Default)]
struct PkgNameEntry {
    name: String,
    packages: Vec<PackageRecord>,
    /// Dense ids of packages that declare a dependency on this name.
    rdeps: Vec<u32>,
}

/// The full set of packages available for installation, indexed by
/// name for dependency compilation and by reverse-dependency for
/// upgrade/removal planning (spec C5).
#[derive(Debug, Default)]
pub struct BinaryIndex {
    name_to_id: HashMap<String, u32>,
    entries: Vec<PkgNameEntry>,
}

impl BinaryIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The dense id for `name`, assigning a fresh one if it is new.
    fn name_id_or_insert(&mut self, name: &str) -> u32 {
        if let Some(&id) = self.name_to_id.get(name) {
            return id;
        }
        let id = self.entries.len() as u32;
        self.entries.push(PkgNameEntry {
            name: name.to_string(),
            packages: Vec::new(),
            rdeps: Vec::new(),
        });
        self.name_to_id.insert(name.to_string(), id);
        id
    }

    /// The dense id for `name`, if it has been seen.
    #[must_use]
    pub fn name_id(&self, name: &str) -> Option<u32> {
        self.name_to_id.get(name).copied()
    }

    /// The name a dense id was assigned to.
    #[must_use]
    pub fn name_of(&self, id: u32) -> &str {
        &self.entries[id as usize].name
    }

    /// The total number of distinct package names known.
    #[must_use]
    pub fn num_names(&self) -> usize {
        self.entries.len()
    }

    /// All package versions known under `name_id`, descending by
    /// version (the order [`crate::compiled_dep::compile_dep`] relies
    /// on).
    #[must_use]
    pub fn packages_of(&self, name_id: u32) -> &[PackageRecord] {
        &self.entries[name_id as usize].packages
    }

    /// Insert a package record, assigning it a `name_id` and keeping
    /// its name's package list sorted by descending version.
    ///
    /// A record with the same `(version, sum_digest)` as an existing
    /// one is treated as the same package seen from another
    /// repository: its remote resources are merged in rather than
    /// duplicating the entry (spec §4.3).
    pub fn insert(&mut self, mut pkg: PackageRecord) -> u32 {
        let name_id = self.name_id_or_insert(&pkg.name);
        pkg.name_id = name_id;
        let list = &mut self.entries[name_id as usize].packages;

        if let Some(existing) = list
            .iter_mut()
            .find(|p| p.identity_key() == pkg.identity_key())
        {
            for res in pkg.remote_resources {
                existing.merge_remote_resources(res);
            }
            return name_id;
        }

        let pos = list
            .binary_search_by(|probe| {
                version::compare(pkg.version.as_str(), probe.version.as_str())
            })
            .unwrap_or_else(|i| i);
        list.insert(pos, pkg);
        name_id
    }

    /// Recompute every name's reverse-dependency set from scratch.
    ///
    /// Must be called once after all repositories have been loaded and
    /// before the index is handed to the solver; returns the names
    /// referenced by some dependency but absent from the index itself
    /// (spec §4.3's "unmet dependency" diagnostic).
    pub fn compute_rdepends(&mut self) -> Vec<String> {
        for entry in &mut self.entries {
            entry.rdeps.clear();
        }

        let mut unmet = Vec::new();
        let edges: Vec<(u32, String)> = self
            .entries
            .iter()
            .flat_map(|entry| {
                entry.packages.iter().flat_map(|pkg| {
                    pkg.mmpack_deps
                        .iter()
                        .map(move |dep| (pkg.name_id, dep.name.clone()))
                })
            })
            .collect();

        for (depender_id, dep_name) in edges {
            match self.name_to_id.get(&dep_name).copied() {
                Some(dep_id) => {
                    let rdeps = &mut self.entries[dep_id as usize].rdeps;
                    if !rdeps.contains(&depender_id) {
                        rdeps.push(depender_id);
                    }
                }
                None => unmet.push(dep_name),
            }
        }
        unmet
    }

    /// The dense ids of packages known to declare a dependency on
    /// `name_id`, populated by [`Self::compute_rdepends`].
    #[must_use]
    pub fn rdeps_of(&self, name_id: u32) -> &[u32] {
        &self.entries[name_id as usize].rdeps
    }

    /// Iterate every package record in the index (supplemented query,
    /// §9.1: backs `mmpack list`/`mmpack search`).
    pub fn iter(&self) -> impl Iterator<Item = &PackageRecord> {
        self.entries.iter().flat_map(|e| e.packages.iter())
    }

    /// Case-insensitive substring search over name and description
    /// (supplemented query, §9.1: backs `mmpack search`).
    #[must_use]
    pub fn search(&self, query: &str) -> Vec<&PackageRecord> {
        let query = query.to_lowercase();
        self.iter()
            .filter(|pkg| {
                pkg.name.to_lowercase().contains(&query)
                    || pkg.description.to_lowercase().contains(&query)
            })
            .collect()
    }

    /// The highest-versioned record for `name`, if any (supplemented
    /// query, §9.1: backs `mmpack show`).
    #[must_use]
    pub fn describe(&self, name: &str) -> Option<&PackageRecord> {
        let id = self.name_id(name)?;
        self.packages_of(id).first()
    }

    /// Names that declare a dependency on `name` (supplemented query,
    /// §9.1: backs `mmpack rdepends`).
    #[must_use]
    pub fn reverse_dependents(&self, name: &str) -> Vec<&str> {
        let Some(id) = self.name_id(name) else {
            return Vec::new();
        };
        self.rdeps_of(id)
            .iter()
            .map(|&rid| self.name_of(rid))
            .collect()
    }
}

/// Order used when binary-searching a name's package list: descending
/// by version, so index 0 is always the newest.
#[must_use]
pub fn descending(a: &PackageRecord, b: &PackageRecord) -> Ordering {
    version::compare(b.version.as_str(), a.version.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ppm_core::{Digest256, Version};

    fn record(name: &str, version: &str) -> PackageRecord {
        PackageRecord {
            name: name.into(),
            name_id: u32::MAX,
            version: Version::new(version),
            source_name: name.into(),
            source_digest: Digest256::from_hex("a".repeat(64)),
            sum_digest: Digest256::from_hex(format!("{:0>64}", format!("{name}{version}"))),
            description: String::new(),
            ghost: false,
            mmpack_deps: vec![],
            sys_deps: vec![],
            remote_resources: vec![],
        }
    }

    #[test]
    fn insert_keeps_descending_version_order() {
        let mut index = BinaryIndex::new();
        index.insert(record("foo", "1.0.0"));
        index.insert(record("foo", "3.0.0"));
        index.insert(record("foo", "2.0.0"));

        let id = index.name_id("foo").unwrap();
        let versions: Vec<_> = index
            .packages_of(id)
            .iter()
            .map(|p| p.version.as_str())
            .collect();
        assert_eq!(versions, vec!["3.0.0", "2.0.0", "1.0.0"]);
    }

    #[test]
    fn insert_dedups_by_identity_and_merges_resources() {
        let mut index = BinaryIndex::new();
        let mut a = record("foo", "1.0.0");
        a.remote_resources.push(crate::package::RemoteResource {
            repo_url: "https://one".into(),
            filename: "foo_1.0.0.mpk".into(),
            file_digest: ppm_core::Digest256::from_hex("c".repeat(64)),
            size: Some(5),
        });
        let mut b = a.clone();
        b.remote_resources[0].repo_url = "https://two".into();

        index.insert(a);
        index.insert(b);

        let id = index.name_id("foo").unwrap();
        assert_eq!(index.packages_of(id).len(), 1);
        assert_eq!(index.packages_of(id)[0].remote_resources.len(), 2);
    }

    #[test]
    fn compute_rdepends_reports_unmet_and_links_known() {
        let mut index = BinaryIndex::new();
        let mut app = record("app", "1.0.0");
        app.mmpack_deps.push(crate::package::DepSpec {
            name: "lib".into(),
            range: crate::package::VersionRange::any(),
        });
        app.mmpack_deps.push(crate::package::DepSpec {
            name: "ghost-dep".into(),
            range: crate::package::VersionRange::any(),
        });
        index.insert(app);
        index.insert(record("lib", "1.0.0"));

        let unmet = index.compute_rdepends();
        assert_eq!(unmet, vec!["ghost-dep".to_string()]);

        let lib_id = index.name_id("lib").unwrap();
        let app_id = index.name_id("app").unwrap();
        assert_eq!(index.rdeps_of(lib_id), &[app_id]);
    }

    #[test]
    fn search_matches_name_and_description_case_insensitively() {
        let mut index = BinaryIndex::new();
        let mut pkg = record("libfoo", "1.0.0");
        pkg.description = "A Fast Parser".into();
        index.insert(pkg);

        assert_eq!(index.search("FOO").len(), 1);
        assert_eq!(index.search("parser").len(), 1);
        assert_eq!(index.search("nope").len(), 0);
    }
}
