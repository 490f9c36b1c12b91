//! Content-addressed archive cache (spec §4.1, C2).
//!
//! Archives are stored under `<cache_dir>/<file-digest-hex>`, keyed by
//! each remote resource's own declared archive digest rather than by
//! name/version, so two repositories advertising the exact same bytes
//! under different filenames share one cache entry.

use crate::error::{CacheError, Result};
use crate::fetcher::RemoteFetcher;
use ppm_core::Digest256;
use ppm_index::PackageRecord;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A content-addressed cache of downloaded package archives.
#[derive(Debug)]
pub struct Cache<F: RemoteFetcher> {
    dir: PathBuf,
    fetcher: F,
}

impl<F: RemoteFetcher> Cache<F> {
    pub fn new(dir: impl Into<PathBuf>, fetcher: F) -> Self {
        Self {
            dir: dir.into(),
            fetcher,
        }
    }

    fn entry_path(&self, digest: &Digest256) -> PathBuf {
        self.dir.join(digest.as_str())
    }

    /// Return the cached path for `pkg`'s archive, downloading it if
    /// it is not already present. Remote resources are tried in the
    /// order the index recorded them (repo-preference order, spec
    /// §4.1); each has its own declared archive digest, so a cache hit
    /// or a download's integrity check is against that resource's
    /// `file_digest`, not the package's source digest. On a mismatch
    /// the resource is discarded and the next alternative is tried.
    pub fn fetch(&self, pkg: &PackageRecord) -> Result<PathBuf> {
        if pkg.remote_resources.is_empty() {
            return Err(CacheError::ResourceUnavailable {
                name: pkg.name.clone(),
            });
        }

        let mut last_err = None;
        for resource in &pkg.remote_resources {
            let entry_path = self.entry_path(&resource.file_digest);
            if entry_path.exists() {
                debug!(path = %entry_path.display(), "cache hit");
                return Ok(entry_path);
            }

            let url = format!(
                "{}/{}",
                resource.repo_url.trim_end_matches('/'),
                resource.filename
            );
            match self.fetcher.fetch(&url) {
                Ok(bytes) => {
                    let actual = Digest256::of_bytes(&bytes);
                    if actual != resource.file_digest {
                        last_err = Some(CacheError::BadDigest {
                            url,
                            expected: resource.file_digest.as_str().to_string(),
                            actual: actual.as_str().to_string(),
                        });
                        continue;
                    }
                    self.store(&entry_path, &bytes)?;
                    info!(name = %pkg.name, path = %entry_path.display(), "fetched and cached archive");
                    return Ok(entry_path);
                }
                Err(e) => last_err = Some(e),
            }
        }

        Err(last_err.unwrap_or(CacheError::ResourceUnavailable {
            name: pkg.name.clone(),
        }))
    }

    fn store(&self, entry_path: &Path, bytes: &[u8]) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|e| CacheError::io(&self.dir, e))?;
        let temp_path = entry_path.with_extension("part");
        fs::write(&temp_path, bytes).map_err(|e| CacheError::io(&temp_path, e))?;
        fs::rename(&temp_path, entry_path).map_err(|e| CacheError::io(entry_path, e))
    }

    /// Fetch and cache `pkg`'s archive without any further processing
    /// (spec §9.1: backs `mmpack download`, which only wants the
    /// archive on disk, not an install).
    pub fn fetch_only(&self, pkg: &PackageRecord) -> Result<PathBuf> {
        self.fetch(pkg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::StaticFetcher;
    use ppm_core::Version;
    use ppm_index::RemoteResource;
    use tempfile::tempdir;

    fn pkg_with(url: &str, body: &[u8]) -> PackageRecord {
        PackageRecord {
            name: "foo".into(),
            name_id: 0,
            version: Version::new("1.0.0"),
            source_name: "foo".into(),
            source_digest: Digest256::of_bytes(b"upstream-source-tarball"),
            sum_digest: Digest256::of_bytes(b"installed-content"),
            description: String::new(),
            ghost: false,
            mmpack_deps: vec![],
            sys_deps: vec![],
            remote_resources: vec![RemoteResource {
                repo_url: url.trim_end_matches("/foo_1.0.0.mpk").to_string(),
                filename: "foo_1.0.0.mpk".to_string(),
                file_digest: Digest256::of_bytes(body),
                size: Some(body.len() as u64),
            }],
        }
    }

    #[test]
    fn fetch_downloads_then_caches() {
        let dir = tempdir().unwrap();
        let body = b"archive bytes";
        let url = "https://repo.example/foo_1.0.0.mpk";
        let fetcher = StaticFetcher::new().with(url, body.to_vec());
        let cache = Cache::new(dir.path(), fetcher);
        let pkg = pkg_with(url, body);

        let path = cache.fetch(&pkg).unwrap();
        assert_eq!(fs::read(&path).unwrap(), body);

        // Second call is a cache hit; no fetcher entry is consulted again,
        // which we can't directly observe here but the same path returns.
        let path2 = cache.fetch(&pkg).unwrap();
        assert_eq!(path, path2);
    }

    #[test]
    fn fetch_rejects_digest_mismatch() {
        let dir = tempdir().unwrap();
        let url = "https://repo.example/foo_1.0.0.mpk";
        let fetcher = StaticFetcher::new().with(url, b"tampered".to_vec());
        let cache = Cache::new(dir.path(), fetcher);
        // file_digest is computed from "original", so the fetched
        // "tampered" bytes won't match it.
        let mut pkg = pkg_with(url, b"original");
        pkg.remote_resources[0].filename = "foo_1.0.0.mpk".into();

        let err = cache.fetch(&pkg).unwrap_err();
        assert!(matches!(err, CacheError::BadDigest { .. }));
    }

    #[test]
    fn fetch_with_no_resources_is_unavailable() {
        let dir = tempdir().unwrap();
        let fetcher = StaticFetcher::new();
        let cache = Cache::new(dir.path(), fetcher);
        let mut pkg = pkg_with("https://x/foo", b"x");
        pkg.remote_resources.clear();

        let err = cache.fetch(&pkg).unwrap_err();
        assert!(matches!(err, CacheError::ResourceUnavailable { .. }));
    }
}
