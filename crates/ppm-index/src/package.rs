//! A single package record as it appears in a binary index (spec C4).

use ppm_core::{Digest256, Version};

/// A version range a dependency must satisfy, `[min, max]` inclusive.
///
/// Either bound may be [`ppm_core::version::ANY`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRange {
    pub min: Version,
    pub max: Version,
}

impl VersionRange {
    #[must_use]
    pub fn any() -> Self {
        Self {
            min: Version::any(),
            max: Version::any(),
        }
    }

    #[must_use]
    pub fn exact(version: Version) -> Self {
        Self {
            min: version.clone(),
            max: version,
        }
    }

    /// `true` when `version` falls within this range.
    #[must_use]
    pub fn contains(&self, version: &Version) -> bool {
        ppm_core::version::in_range(version.as_str(), self.min.as_str(), self.max.as_str())
    }
}

/// A single `<name> (>= min, < max)` dependency, as parsed from an
/// index record's `depends` field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepSpec {
    pub name: String,
    pub range: VersionRange,
}

/// A location a package's archive can be fetched from (spec C2/C4).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteResource {
    /// Repository base URL this resource was advertised by.
    pub repo_url: String,
    /// Archive filename relative to the repository.
    pub filename: String,
    /// SHA-256 of the archive file itself, as advertised by this
    /// resource's repository. Distinct from [`PackageRecord::source_digest`]
    /// (the upstream source tarball's digest) — this is what the cache
    /// keys and verifies downloaded bytes against.
    pub file_digest: Digest256,
    /// Archive size in bytes, when advertised.
    pub size: Option<u64>,
}

/// One entry of a binary index: a specific `(name, version)` pair and
/// everything needed to resolve, fetch, and install it (spec C4).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRecord {
    pub name: String,
    /// Dense id assigned by the owning [`crate::BinaryIndex`]; `u32::MAX`
    /// until the record has been inserted.
    pub name_id: u32,
    pub version: Version,
    pub source_name: String,
    pub source_digest: Digest256,
    pub sum_digest: Digest256,
    pub description: String,
    /// A ghost package is a placeholder for a dependency whose real
    /// definition was never fetched (spec §4.3); it can satisfy a
    /// dependency edge but can never itself be installed.
    pub ghost: bool,
    pub mmpack_deps: Vec<DepSpec>,
    pub sys_deps: Vec<String>,
    pub remote_resources: Vec<RemoteResource>,
}

impl PackageRecord {
    /// An identity usable as a dedup/merge key across repositories:
    /// same version and same installed-content digest means the same
    /// package, even if it came from two different remote URLs.
    #[must_use]
    pub fn identity_key(&self) -> (&Version, &Digest256) {
        (&self.version, &self.sum_digest)
    }

    /// Merge another record's remote resources into this one, keeping
    /// everything else unchanged. Used when the same `(version,
    /// sum_digest)` pair is seen from a second repository (spec §4.3).
    pub fn merge_remote_resources(&mut self, other: RemoteResource) {
        if !self
            .remote_resources
            .iter()
            .any(|r| r.repo_url == other.repo_url)
        {
            self.remote_resources.push(other);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(version: &str) -> PackageRecord {
        PackageRecord {
            name: "foo".into(),
            name_id: 0,
            version: Version::new(version),
            source_name: "foo".into(),
            source_digest: Digest256::from_hex("a".repeat(64)),
            sum_digest: Digest256::from_hex("b".repeat(64)),
            description: String::new(),
            ghost: false,
            mmpack_deps: vec![],
            sys_deps: vec![],
            remote_resources: vec![],
        }
    }

    #[test]
    fn version_range_contains_respects_bounds() {
        let range = VersionRange {
            min: Version::new("1.0.0"),
            max: Version::new("2.0.0"),
        };
        assert!(range.contains(&Version::new("1.5.0")));
        assert!(!range.contains(&Version::new("2.0.1")));
    }

    #[test]
    fn merge_remote_resources_dedups_by_repo() {
        let mut p = rec("1.0.0");
        p.merge_remote_resources(RemoteResource {
            repo_url: "https://a".into(),
            filename: "foo_1.0.0.mpk".into(),
            file_digest: Digest256::from_hex("c".repeat(64)),
            size: Some(10),
        });
        p.merge_remote_resources(RemoteResource {
            repo_url: "https://a".into(),
            filename: "foo_1.0.0.mpk".into(),
            file_digest: Digest256::from_hex("c".repeat(64)),
            size: Some(10),
        });
        assert_eq!(p.remote_resources.len(), 1);
    }
}
