//! Extraction of package archives (spec §4.2, §6, C3).
//!
//! A package archive is a single tar stream, optionally wrapped in one
//! compression layer (gzip, xz, or bzip2, auto-detected from its first
//! bytes), whose entries live under an `MMPACK/` or plain top-level
//! prefix. The compression and naming scheme are simpler than the
//! teacher's general-purpose `Extractor` (no zip/7z/rar — those are
//! archive formats this system's packages are never published in), but
//! the streaming-entries-then-rename shape is the same.

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

use ppm_core::{Error, Result};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const XZ_MAGIC: [u8; 6] = [0xfd, b'7', b'z', b'X', b'Z', 0x00];
const BZIP2_MAGIC: [u8; 3] = [b'B', b'Z', b'h'];

/// The compression layer wrapping a tar stream, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip,
    Xz,
    Bzip2,
}

impl Compression {
    /// Sniff the compression layer from an archive's leading bytes.
    #[must_use]
    pub fn sniff(bytes: &[u8]) -> Self {
        if bytes.starts_with(&GZIP_MAGIC) {
            Self::Gzip
        } else if bytes.starts_with(&XZ_MAGIC) {
            Self::Xz
        } else if bytes.starts_with(&BZIP2_MAGIC) {
            Self::Bzip2
        } else {
            Self::None
        }
    }
}

/// One entry of a tar stream as reported during extraction.
#[derive(Debug, Clone)]
pub struct ExtractedEntry {
    pub path: String,
    pub kind: EntryType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryType {
    Regular,
    Directory,
    Symlink,
}

/// The result of extracting a full archive.
#[derive(Debug, Default)]
pub struct ExtractionReport {
    pub entries: Vec<ExtractedEntry>,
    pub total_bytes: u64,
}

fn open_tar_reader(archive_path: &Path) -> Result<(Compression, File)> {
    let file = File::open(archive_path).map_err(|e| Error::io(archive_path, e))?;
    let mut head = File::open(archive_path).map_err(|e| Error::io(archive_path, e))?;
    let mut buf = [0u8; 6];
    let n = head.read(&mut buf).map_err(|e| Error::io(archive_path, e))?;
    Ok((Compression::sniff(&buf[..n]), file))
}

fn decode_tar(compression: Compression, file: File) -> tar::Archive<Box<dyn Read>> {
    let reader: Box<dyn Read> = match compression {
        Compression::None => Box::new(file),
        Compression::Gzip => Box::new(flate2::read::GzDecoder::new(file)),
        Compression::Xz => Box::new(xz2::read::XzDecoder::new(file)),
        Compression::Bzip2 => Box::new(bzip2::read::BzDecoder::new(file)),
    };
    tar::Archive::new(reader)
}

/// Strip a leading `./` component, the only normalization a tar path
/// needs before it is either installed as payload or matched as a
/// metadata path.
fn strip_leading_curdir(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, std::path::Component::CurDir))
        .collect()
}

/// The install path for a payload entry, or `None` if `path` falls
/// under the reserved `MMPACK/` metadata prefix and must not be
/// installed (spec §6: "All other entries are the package's payload
/// and are installed into the prefix at paths equal to their
/// in-archive paths"; `MMPACK/metadata`, `MMPACK/info`, and
/// `MMPACK/<pkgname>.sha256sums` are reserved). Matches
/// `is_mmpack_metadata()`'s plain prefix check.
fn payload_path(path: &Path) -> Option<PathBuf> {
    let normalized = strip_leading_curdir(path);
    let first = normalized.components().next()?;
    if first.as_os_str() == "MMPACK" {
        return None;
    }
    Some(normalized)
}

/// Extract every entry of `archive_path` under `dest`, creating `dest`
/// if it does not exist.
pub fn extract(archive_path: &Path, dest: &Path) -> Result<ExtractionReport> {
    std::fs::create_dir_all(dest).map_err(|e| Error::io(dest, e))?;
    let (compression, file) = open_tar_reader(archive_path)?;
    let mut archive = decode_tar(compression, file);

    let mut report = ExtractionReport::default();

    for entry in archive
        .entries()
        .map_err(|e| Error::bad_format(format!("malformed tar stream: {e}")))?
    {
        let mut entry =
            entry.map_err(|e| Error::bad_format(format!("malformed tar entry: {e}")))?;
        let raw_path = entry
            .path()
            .map_err(|e| Error::bad_format(format!("non-UTF-8 entry path: {e}")))?
            .into_owned();
        let Some(relative) = payload_path(&raw_path) else {
            continue;
        };
        if relative.as_os_str().is_empty() {
            continue;
        }

        let path_str = relative
            .to_str()
            .ok_or_else(|| Error::bad_format(format!("non-UTF-8 entry path: {raw_path:?}")))?
            .to_string();
        let out_path = dest.join(&relative);

        let header_type = entry.header().entry_type();
        let kind = if header_type.is_dir() {
            EntryType::Directory
        } else if header_type.is_symlink() {
            EntryType::Symlink
        } else {
            EntryType::Regular
        };

        match kind {
            EntryType::Directory => {
                std::fs::create_dir_all(&out_path).map_err(|e| Error::io(&out_path, e))?;
            }
            EntryType::Symlink => {
                if let Some(parent) = out_path.parent() {
                    std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
                }
                let target = entry
                    .link_name()
                    .map_err(|e| Error::bad_format(format!("bad symlink target: {e}")))?
                    .ok_or_else(|| Error::bad_format("symlink entry missing target"))?
                    .into_owned();
                #[cfg(unix)]
                std::os::unix::fs::symlink(&target, &out_path)
                    .map_err(|e| Error::io(&out_path, e))?;
                #[cfg(not(unix))]
                std::fs::copy(&target, &out_path).map_err(|e| Error::io(&out_path, e))?;
            }
            EntryType::Regular => {
                if let Some(parent) = out_path.parent() {
                    std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
                }
                let mut out_file = File::create(&out_path).map_err(|e| Error::io(&out_path, e))?;
                let bytes = std::io::copy(&mut entry, &mut out_file)
                    .map_err(|e| Error::io(&out_path, e))?;
                report.total_bytes += bytes;

                #[cfg(unix)]
                {
                    use std::os::unix::fs::PermissionsExt;
                    if let Ok(mode) = entry.header().mode() {
                        let _ = std::fs::set_permissions(
                            &out_path,
                            std::fs::Permissions::from_mode(mode),
                        );
                    }
                }
            }
        }

        report.entries.push(ExtractedEntry {
            path: path_str,
            kind,
        });
    }

    debug!(archive = %archive_path.display(), entries = report.entries.len(), "extracted archive");
    Ok(report)
}

/// Load a single named entry's content into memory without extracting
/// the whole archive (used to read a package's metadata record ahead
/// of a full install, e.g. `entry_path = "MMPACK/info"`). Unlike
/// [`extract`], this looks an entry up by its literal in-archive path
/// (leading `./` aside), since the entries it is meant for live under
/// the reserved `MMPACK/` prefix [`extract`] excludes.
pub fn read_entry(archive_path: &Path, entry_path: &str) -> Result<Vec<u8>> {
    let (compression, file) = open_tar_reader(archive_path)?;
    let mut archive = decode_tar(compression, file);

    for entry in archive
        .entries()
        .map_err(|e| Error::bad_format(format!("malformed tar stream: {e}")))?
    {
        let mut entry =
            entry.map_err(|e| Error::bad_format(format!("malformed tar entry: {e}")))?;
        let raw_path = entry
            .path()
            .map_err(|e| Error::bad_format(format!("non-UTF-8 entry path: {e}")))?
            .into_owned();
        let relative = strip_leading_curdir(&raw_path);
        if relative == Path::new(entry_path) {
            let mut buf = Vec::new();
            entry
                .read_to_end(&mut buf)
                .map_err(|e| Error::io(archive_path, e))?;
            return Ok(buf);
        }
    }

    Err(Error::not_found(format!(
        "{entry_path} not found in {}",
        archive_path.display()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
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

    #[test]
    fn sniff_detects_gzip_magic() {
        assert_eq!(Compression::sniff(&[0x1f, 0x8b, 0]), Compression::Gzip);
        assert_eq!(Compression::sniff(b"hello"), Compression::None);
    }

    #[test]
    fn extract_installs_top_level_entries_and_excludes_mmpack_metadata() {
        let dir = tempdir().unwrap();
        let archive_path = dir.path().join("pkg.tar");
        let tar_bytes = make_tar(&[
            ("bin/foo", b"binary data"),
            ("MMPACK/metadata", b"pkginfo-path: ...\n"),
            ("MMPACK/foo.sha256sums", b"bin/foo : reg-aa\n"),
        ]);
        std::fs::write(&archive_path, &tar_bytes).unwrap();

        let dest = dir.path().join("out");
        let report = extract(&archive_path, &dest).unwrap();

        assert_eq!(report.entries.len(), 1);
        assert_eq!(report.entries[0].path, "bin/foo");
        assert!(dest.join("bin/foo").exists());
        assert!(!dest.join("MMPACK").exists());
    }

    #[test]
    fn extract_handles_gzip_compressed_tar() {
        let dir = tempdir().unwrap();
        let archive_path = dir.path().join("pkg.tar.gz");
        let tar_bytes = make_tar(&[("file.txt", b"hi")]);

        let mut enc = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        enc.write_all(&tar_bytes).unwrap();
        std::fs::write(&archive_path, enc.finish().unwrap()).unwrap();

        let dest = dir.path().join("out");
        let report = extract(&archive_path, &dest).unwrap();
        assert_eq!(report.entries.len(), 1);
    }

    #[test]
    fn extract_reports_no_payload_when_archive_is_only_metadata() {
        let dir = tempdir().unwrap();
        let archive_path = dir.path().join("pkg.tar");
        let tar_bytes = make_tar(&[("MMPACK/info", b"name: foo\n")]);
        std::fs::write(&archive_path, &tar_bytes).unwrap();

        let dest = dir.path().join("out");
        let report = extract(&archive_path, &dest).unwrap();
        assert!(report.entries.is_empty());
    }

    #[test]
    fn read_entry_extracts_single_metadata_file_without_full_unpack() {
        let dir = tempdir().unwrap();
        let archive_path = dir.path().join("pkg.tar");
        let tar_bytes = make_tar(&[
            ("MMPACK/info", b"name: foo\n"),
            ("bin/foo", b"binary"),
        ]);
        std::fs::write(&archive_path, &tar_bytes).unwrap();

        let content = read_entry(&archive_path, "MMPACK/info").unwrap();
        assert_eq!(content, b"name: foo\n");

        assert!(read_entry(&archive_path, "missing").is_err());
    }
}
