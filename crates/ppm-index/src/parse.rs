//! Parsing a repository's binary index from its on-disk key-value block
//! format (spec §4.3), grounded on `binpkg_save_to_buffer()` /
//! `pkgdep_save_to_keyval()` (the writer side of the same format).
//!
//! Records are separated by a blank line. Each record is a sequence of
//! `key: value` lines; `depends`, `sysdepends` and `description` take
//! their value from the indented lines that follow the `key:` line,
//! one comma-separated entry per line, until the first line that is
//! not indented.
//!
//! ```text
//! name: foo
//! version: 1.2.0
//! source: foo_1.2.0.orig.tar.gz
//! srcsha256: <64 hex chars>
//! sumsha256sums: <64 hex chars>
//! ghost: false
//! depends:
//!  bar (>= 1.0.0),
//!  baz
//! sysdepends:
//!  libc6
//! description:
//!  A short description.
//! ```

use crate::package::{DepSpec, PackageRecord, RemoteResource, VersionRange};
use ppm_core::{Digest256, Error, Result, Version};
use std::io::Read;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Read a repository index from a byte stream, transparently
/// decompressing it first if it starts with the gzip magic number.
pub fn parse_index(repo_url: &str, bytes: &[u8]) -> Result<Vec<PackageRecord>> {
    let decompressed;
    let text_bytes = if bytes.starts_with(&GZIP_MAGIC) {
        use flate2::read::GzDecoder;
        let mut out = Vec::new();
        GzDecoder::new(bytes)
            .read_to_end(&mut out)
            .map_err(|e| Error::bad_format(format!("gzip decode failed: {e}")))?;
        decompressed = out;
        &decompressed
    } else {
        bytes
    };

    let text = std::str::from_utf8(text_bytes)
        .map_err(|e| Error::bad_format(format!("index is not valid UTF-8: {e}")))?;

    split_records(text)
        .into_iter()
        .map(|block| parse_record(repo_url, block))
        .collect()
}

/// Split index text into blank-line-separated record blocks.
fn split_records(text: &str) -> Vec<&str> {
    text.split("\n\n")
        .map(str::trim)
        .filter(|block| !block.is_empty())
        .collect()
}

/// A parsed `key: value` line plus whatever indented continuation
/// lines follow it.
struct Field<'a> {
    key: &'a str,
    value: &'a str,
    continuation: Vec<&'a str>,
}

fn split_fields(block: &str) -> Vec<Field<'_>> {
    let mut fields = Vec::new();
    for line in block.lines() {
        if let Some(rest) = line.strip_prefix(' ') {
            if let Some(last) = fields.last_mut() {
                let entry: &mut Field = last;
                entry.continuation.push(rest.trim_end_matches(','));
            }
            continue;
        }
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        fields.push(Field {
            key: key.trim(),
            value: value.trim(),
            continuation: Vec::new(),
        });
    }
    fields
}

fn find<'a>(fields: &'a [Field<'a>], key: &str) -> Option<&'a Field<'a>> {
    fields.iter().find(|f| f.key == key)
}

fn parse_record(repo_url: &str, block: &str) -> Result<PackageRecord> {
    let fields = split_fields(block);

    let name = find(&fields, "name")
        .map(|f| f.value.to_string())
        .ok_or_else(|| Error::bad_format("index record missing 'name'"))?;
    let version = find(&fields, "version")
        .map(|f| Version::new(f.value))
        .ok_or_else(|| Error::bad_format(format!("{name}: missing 'version'")))?;
    let source_name = find(&fields, "source")
        .map(|f| f.value.to_string())
        .ok_or_else(|| Error::bad_format(format!("{name}: missing 'source'")))?;
    let source_digest = find(&fields, "srcsha256")
        .map(|f| Digest256::from_hex(f.value))
        .ok_or_else(|| Error::bad_format(format!("{name}: missing 'srcsha256'")))?;
    let sum_digest = find(&fields, "sumsha256sums")
        .map(|f| Digest256::from_hex(f.value))
        .ok_or_else(|| Error::bad_format(format!("{name}: missing 'sumsha256sums'")))?;
    let ghost = find(&fields, "ghost").is_some_and(|f| f.value == "true");

    let mmpack_deps = find(&fields, "depends")
        .map(|f| parse_deps(&f.continuation))
        .transpose()?
        .unwrap_or_default();

    let sys_deps = find(&fields, "sysdepends")
        .map(|f| {
            f.continuation
                .iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default();

    let description = find(&fields, "description")
        .map(|f| f.continuation.join(" ").trim().to_string())
        .unwrap_or_default();

    let mut remote_resources = Vec::new();
    if let Some(filename) = find(&fields, "filename") {
        let file_digest = find(&fields, "sha256")
            .map(|f| Digest256::from_hex(f.value))
            .ok_or_else(|| Error::bad_format(format!("{name}: missing 'sha256' for filename")))?;
        let size = find(&fields, "size").and_then(|f| f.value.parse().ok());
        remote_resources.push(RemoteResource {
            repo_url: repo_url.to_string(),
            filename: filename.value.to_string(),
            file_digest,
            size,
        });
    }

    Ok(PackageRecord {
        name,
        name_id: u32::MAX,
        version,
        source_name,
        source_digest,
        sum_digest,
        description,
        ghost,
        mmpack_deps,
        sys_deps,
        remote_resources,
    })
}

/// Parse a prefix's own installed-package list (spec §6: "Same
/// block-based key-value as a repository index, minus the
/// `filename`/`sha256`/`size` fields"). No `repo_url` applies to an
/// installed-only record, and with no `filename` key present in the
/// text `parse_record` naturally leaves `remote_resources` empty.
pub fn parse_installed_list(bytes: &[u8]) -> Result<Vec<PackageRecord>> {
    parse_index("", bytes)
}

/// Render `pkg` as one installed-list block: every key a repository
/// record would carry except `filename`/`sha256`/`size`, the mirror
/// image of what [`parse_installed_list`] reads back.
#[must_use]
pub fn format_installed_record(pkg: &PackageRecord) -> String {
    let mut out = String::new();
    out.push_str("name: ");
    out.push_str(&pkg.name);
    out.push('\n');
    out.push_str("version: ");
    out.push_str(pkg.version.as_str());
    out.push('\n');
    out.push_str("source: ");
    out.push_str(&pkg.source_name);
    out.push('\n');
    out.push_str("srcsha256: ");
    out.push_str(pkg.source_digest.as_str());
    out.push('\n');
    out.push_str("sumsha256sums: ");
    out.push_str(pkg.sum_digest.as_str());
    out.push('\n');
    out.push_str("ghost: ");
    out.push_str(if pkg.ghost { "true" } else { "false" });
    out.push('\n');

    if !pkg.mmpack_deps.is_empty() {
        out.push_str("depends:\n");
        for (i, dep) in pkg.mmpack_deps.iter().enumerate() {
            out.push(' ');
            out.push_str(&format_dep(dep));
            let sep = if i + 1 == pkg.mmpack_deps.len() { "" } else { "," };
            out.push_str(sep);
            out.push('\n');
        }
    }

    if !pkg.sys_deps.is_empty() {
        out.push_str("sysdepends:\n");
        for dep in &pkg.sys_deps {
            out.push(' ');
            out.push_str(dep);
            out.push('\n');
        }
    }

    if !pkg.description.is_empty() {
        out.push_str("description:\n ");
        out.push_str(&pkg.description);
        out.push('\n');
    }

    out
}

/// Render one `depends:` entry the way [`parse_one_dep`] expects to
/// read it back: plain name, `name (= v)`, or `name (>= min, < max)`.
fn format_dep(dep: &DepSpec) -> String {
    let min_any = dep.range.min.is_any();
    let max_any = dep.range.max.is_any();
    if min_any && max_any {
        return dep.name.clone();
    }
    if !min_any && dep.range.min == dep.range.max {
        return format!("{} (= {})", dep.name, dep.range.min.as_str());
    }
    let mut constraints = Vec::new();
    if !min_any {
        constraints.push(format!(">= {}", dep.range.min.as_str()));
    }
    if !max_any {
        constraints.push(format!("< {}", dep.range.max.as_str()));
    }
    format!("{} ({})", dep.name, constraints.join(", "))
}

/// Parse `depends:` continuation lines, each of the form
/// `name`, `name (= version)`, `name (>= min)`, `name (< max)`, or
/// `name (>= min, < max)`.
fn parse_deps(lines: &[&str]) -> Result<Vec<DepSpec>> {
    lines
        .iter()
        .map(|raw| raw.trim())
        .filter(|s| !s.is_empty())
        .map(parse_one_dep)
        .collect()
}

fn parse_one_dep(entry: &str) -> Result<DepSpec> {
    let Some(paren) = entry.find('(') else {
        return Ok(DepSpec {
            name: entry.trim().to_string(),
            range: VersionRange::any(),
        });
    };

    let name = entry[..paren].trim().to_string();
    let constraints = entry[paren + 1..]
        .trim_end_matches(')')
        .trim();

    let mut min = Version::any();
    let mut max = Version::any();
    for clause in constraints.split(',') {
        let clause = clause.trim();
        if let Some(v) = clause.strip_prefix(">=") {
            min = Version::new(v.trim());
        } else if let Some(v) = clause.strip_prefix('=') {
            min = Version::new(v.trim());
            max = Version::new(v.trim());
        } else if let Some(v) = clause.strip_prefix('<') {
            max = Version::new(v.trim());
        } else if !clause.is_empty() {
            return Err(Error::bad_format(format!(
                "invalid dependency constraint: {entry}"
            )));
        }
    }

    Ok(DepSpec {
        name,
        range: VersionRange { min, max },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "name: foo\n\
version: 1.2.0\n\
source: foo_1.2.0.orig.tar.gz\n\
srcsha256: aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa\n\
sumsha256sums: bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb\n\
ghost: false\n\
depends:\n\
 bar (>= 1.0.0, < 2.0.0),\n\
 baz\n\
sysdepends:\n\
 libc6\n\
description:\n\
 A short description.\n\
filename: foo_1.2.0.mpk\n\
sha256: cccccccccccccccccccccccccccccccccccccccccccccccccccccccccccccc\n\
size: 4096\n";

    #[test]
    fn parses_a_full_record() {
        let records = parse_index("https://repo.example", SAMPLE.as_bytes()).unwrap();
        assert_eq!(records.len(), 1);
        let pkg = &records[0];
        assert_eq!(pkg.name, "foo");
        assert_eq!(pkg.version.as_str(), "1.2.0");
        assert_eq!(pkg.mmpack_deps.len(), 2);
        assert_eq!(pkg.mmpack_deps[0].name, "bar");
        assert_eq!(pkg.mmpack_deps[0].range.min.as_str(), "1.0.0");
        assert_eq!(pkg.mmpack_deps[0].range.max.as_str(), "2.0.0");
        assert!(pkg.mmpack_deps[1].range.min.is_any());
        assert_eq!(pkg.sys_deps, vec!["libc6".to_string()]);
        assert_eq!(pkg.description, "A short description.");
        assert_eq!(pkg.remote_resources.len(), 1);
        assert_eq!(pkg.remote_resources[0].size, Some(4096));
        assert_eq!(
            pkg.remote_resources[0].file_digest.as_str(),
            "cccccccccccccccccccccccccccccccccccccccccccccccccccccccccccccc"
        );
        assert!(!pkg.ghost);
    }

    #[test]
    fn parses_multiple_records_separated_by_blank_line() {
        let two = format!("{SAMPLE}\n{SAMPLE}");
        let records = parse_index("https://repo.example", two.as_bytes()).unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn missing_required_field_is_bad_format() {
        let broken = "name: foo\nversion: 1.0.0\n";
        let err = parse_index("https://repo.example", broken.as_bytes()).unwrap_err();
        assert_eq!(err.kind(), ppm_core::ErrorKind::BadFormat);
    }

    #[test]
    fn gzip_compressed_index_is_transparently_decoded() {
        use flate2::write::GzEncoder;
        use flate2::Compression;
        use std::io::Write;

        let mut enc = GzEncoder::new(Vec::new(), Compression::default());
        enc.write_all(SAMPLE.as_bytes()).unwrap();
        let gz = enc.finish().unwrap();

        let records = parse_index("https://repo.example", &gz).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn format_installed_record_round_trips_through_parse_installed_list() {
        let pkg = PackageRecord {
            name: "foo".into(),
            name_id: u32::MAX,
            version: Version::new("1.2.0"),
            source_name: "foo_1.2.0.orig.tar.gz".into(),
            source_digest: Digest256::from_hex("a".repeat(64)),
            sum_digest: Digest256::from_hex("b".repeat(64)),
            description: "A short description.".into(),
            ghost: false,
            mmpack_deps: vec![
                DepSpec {
                    name: "bar".into(),
                    range: VersionRange {
                        min: Version::new("1.0.0"),
                        max: Version::new("2.0.0"),
                    },
                },
                DepSpec {
                    name: "baz".into(),
                    range: VersionRange::any(),
                },
            ],
            sys_deps: vec!["libc6".into()],
            remote_resources: vec![],
        };

        let text = format_installed_record(&pkg);
        assert!(!text.contains("filename:"));
        assert!(!text.contains("sha256:"));
        assert!(!text.contains("size:"));

        let parsed = parse_installed_list(text.as_bytes()).unwrap();
        assert_eq!(parsed.len(), 1);
        let round = &parsed[0];
        assert_eq!(round.name, "foo");
        assert_eq!(round.version, pkg.version);
        assert_eq!(round.source_digest, pkg.source_digest);
        assert_eq!(round.sum_digest, pkg.sum_digest);
        assert_eq!(round.mmpack_deps.len(), 2);
        assert_eq!(round.mmpack_deps[0].range.min.as_str(), "1.0.0");
        assert!(round.mmpack_deps[1].range.min.is_any());
        assert!(round.remote_resources.is_empty());
    }

    #[test]
    fn installed_list_record_merges_with_matching_repo_record() {
        // spec §8: loading an installed-list record and then a
        // repository index record for the same (name, version,
        // sum_digest) produces one record with one remote resource.
        let installed_text = "name: foo\n\
version: 1.2.0\n\
source: foo_1.2.0.orig.tar.gz\n\
srcsha256: aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa\n\
sumsha256sums: bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb\n\
ghost: false\n";

        let mut index = crate::BinaryIndex::new();
        for record in parse_installed_list(installed_text.as_bytes()).unwrap() {
            index.insert(record);
        }
        for record in parse_index("https://repo.example", SAMPLE.as_bytes()).unwrap() {
            index.insert(record);
        }

        let id = index.name_id("foo").unwrap();
        let packages = index.packages_of(id);
        assert_eq!(packages.len(), 1);
        assert_eq!(packages[0].remote_resources.len(), 1);
    }
}
