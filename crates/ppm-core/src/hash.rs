//! SHA-256 digests over files and symlink targets (spec §4.1, C1).
//!
//! A [`TypedHash`] is the unit the install-state sum-files are built
//! from: `reg-<hex>` for a regular file's content, `sym-<hex>` for a
//! symlink's target string. Both are plain SHA-256 hex digests; the
//! prefix only tags which kind of content was hashed.

use crate::error::{Error, Result};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

const READ_CHUNK: usize = 64 * 1024;

/// A hex-encoded SHA-256 digest, with no `reg-`/`sym-` prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digest256(String);

impl Digest256 {
    /// Wrap an already-hex-encoded digest, lowercasing it for comparisons.
    #[must_use]
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into().to_ascii_lowercase())
    }

    /// The lowercase hex representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Compute the digest of an open stream, reading it to completion.
    pub fn of_reader(mut r: impl Read) -> io::Result<Self> {
        let mut hasher = Sha256::new();
        let mut buf = [0u8; READ_CHUNK];
        loop {
            let n = r.read(&mut buf)?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
        Ok(Self(hex::encode(hasher.finalize())))
    }

    /// Compute the digest of a regular file's content.
    pub fn of_file(path: &Path) -> Result<Self> {
        let f = File::open(path).map_err(|e| Error::io(path, e))?;
        Self::of_reader(f).map_err(|e| Error::io(path, e))
    }

    /// Compute the digest of bytes already in memory.
    #[must_use]
    pub fn of_bytes(data: &[u8]) -> Self {
        Self(hex::encode(Sha256::digest(data)))
    }

    /// Compute the digest of a symlink's target string.
    ///
    /// The target is hashed as the raw path bytes, excluding any NUL
    /// terminator, matching the sum-file convention of spec §3.
    pub fn of_symlink_target(path: &Path) -> Result<Self> {
        let target = std::fs::read_link(path).map_err(|e| Error::io(path, e))?;
        #[cfg(unix)]
        let bytes: Vec<u8> = {
            use std::os::unix::ffi::OsStrExt;
            target.as_os_str().as_bytes().to_vec()
        };
        #[cfg(not(unix))]
        let bytes: Vec<u8> = target.to_string_lossy().into_owned().into_bytes();
        Ok(Self::of_bytes(&bytes))
    }
}

impl fmt::Display for Digest256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The type of filesystem entry a [`TypedHash`] was computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// A regular file; hash is over its content.
    Regular,
    /// A symbolic link; hash is over its target string.
    Symlink,
}

impl EntryKind {
    const fn tag(self) -> &'static str {
        match self {
            Self::Regular => "reg",
            Self::Symlink => "sym",
        }
    }
}

/// A `reg-<hex>` / `sym-<hex>` typed hash as stored in a sum-file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypedHash {
    kind: EntryKind,
    digest: Digest256,
}

impl TypedHash {
    /// Build a typed hash from its parts.
    #[must_use]
    pub const fn new(kind: EntryKind, digest: Digest256) -> Self {
        Self { kind, digest }
    }

    /// Hash `path` according to whether it is currently a symlink or a
    /// regular file on disk.
    pub fn of_path(path: &Path) -> Result<Self> {
        let meta = std::fs::symlink_metadata(path).map_err(|e| Error::io(path, e))?;
        if meta.file_type().is_symlink() {
            Ok(Self::new(EntryKind::Symlink, Digest256::of_symlink_target(path)?))
        } else {
            Ok(Self::new(EntryKind::Regular, Digest256::of_file(path)?))
        }
    }

    /// The entry kind this hash was computed over.
    #[must_use]
    pub const fn kind(&self) -> EntryKind {
        self.kind
    }

    /// The underlying digest, without its type tag.
    #[must_use]
    pub const fn digest(&self) -> &Digest256 {
        &self.digest
    }

    /// Recompute the hash for `path` and compare it against `self`.
    ///
    /// Returns `Ok(true)` when they match, `Ok(false)` on a clean
    /// mismatch (the caller reports `BAD_DIGEST`), and `Err` only for
    /// I/O failures distinct from "file changed".
    pub fn verify(&self, path: &Path) -> Result<bool> {
        let actual = Self::of_path(path)?;
        Ok(&actual == self)
    }

    /// Parse a `reg-<hex>` / `sym-<hex>` token from a sum-file line.
    pub fn parse(s: &str) -> Result<Self> {
        let (tag, hex) = s
            .split_once('-')
            .ok_or_else(|| Error::bad_format(format!("malformed typed hash: {s}")))?;
        let kind = match tag {
            "reg" => EntryKind::Regular,
            "sym" => EntryKind::Symlink,
            other => {
                return Err(Error::bad_format(format!("unknown hash tag: {other}")));
            }
        };
        if hex.len() != 64 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(Error::bad_format(format!("malformed hex digest: {hex}")));
        }
        Ok(Self::new(kind, Digest256::from_hex(hex)))
    }
}

impl fmt::Display for TypedHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.kind.tag(), self.digest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn round_trip_regular_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("f.txt");
        std::fs::write(&path, b"hello world").unwrap();

        let h = TypedHash::of_path(&path).unwrap();
        assert_eq!(h.kind(), EntryKind::Regular);
        assert!(h.verify(&path).unwrap());

        let mut f = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
        f.write_all(b"!").unwrap();
        assert!(!h.verify(&path).unwrap());
    }

    #[cfg(unix)]
    #[test]
    fn round_trip_symlink() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("target.txt");
        std::fs::write(&target, b"data").unwrap();
        let link = dir.path().join("link");
        std::os::unix::fs::symlink(&target, &link).unwrap();

        let h = TypedHash::of_path(&link).unwrap();
        assert_eq!(h.kind(), EntryKind::Symlink);
        assert!(h.verify(&link).unwrap());
    }

    #[test]
    fn parse_and_display_round_trip() {
        let original = "reg-aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
        let parsed = TypedHash::parse(original).unwrap();
        assert_eq!(parsed.to_string(), original);
    }

    #[test]
    fn parse_rejects_bad_tag() {
        assert!(TypedHash::parse("oops-1234").is_err());
    }

    #[test]
    fn digest_of_bytes_is_stable() {
        let a = Digest256::of_bytes(b"abc");
        let b = Digest256::of_bytes(b"abc");
        assert_eq!(a, b);
    }
}
