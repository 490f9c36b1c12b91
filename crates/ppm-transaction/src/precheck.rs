//! Step 1 of §4.7: aggregate every INSTALL/UPGRADE target's `sys_deps`
//! and ask the system-dependency probe (C10) which are unmet.

use crate::types::StagedAction;
use ppm_core::{Error, ErrorKind, Result};
use ppm_sysdep::SysdepProbe;

/// Abort with `MISSING_SYSDEP` if any target's declared system
/// dependency is unsatisfied on the host.
pub fn precheck(actions: &[StagedAction<'_>], probe: &impl SysdepProbe) -> Result<()> {
    let mut names = Vec::new();
    for action in actions {
        let pkg = match action {
            StagedAction::Install { pkg, .. } => Some(*pkg),
            StagedAction::Upgrade { new, .. } => Some(*new),
            StagedAction::Remove { .. } => None,
        };
        if let Some(pkg) = pkg {
            for dep in &pkg.sys_deps {
                if !names.contains(dep) {
                    names.push(dep.clone());
                }
            }
        }
    }

    if names.is_empty() {
        return Ok(());
    }

    let missing = probe.missing(&names)?;
    if missing.is_empty() {
        return Ok(());
    }

    Err(Error::new(
        ErrorKind::MissingSysdep,
        format!("missing system dependencies: {}", missing.join(", ")),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ppm_core::{Digest256, Version};
    use ppm_index::{PackageRecord, RemoteResource};
    use ppm_sysdep::NullProbe;

    fn pkg(sys_deps: Vec<&str>) -> PackageRecord {
        PackageRecord {
            name: "app".into(),
            name_id: 0,
            version: Version::new("1.0.0"),
            source_name: "app".into(),
            source_digest: Digest256::from_hex("a".repeat(64)),
            sum_digest: Digest256::from_hex("b".repeat(64)),
            description: String::new(),
            ghost: false,
            mmpack_deps: vec![],
            sys_deps: sys_deps.into_iter().map(String::from).collect(),
            remote_resources: vec![RemoteResource {
                repo_url: "https://repo".into(),
                filename: "app_1.0.0.mpk".into(),
                file_digest: Digest256::from_hex("c".repeat(64)),
                size: Some(1),
            }],
        }
    }

    struct AlwaysMissing;
    impl SysdepProbe for AlwaysMissing {
        fn missing(&self, names: &[String]) -> Result<Vec<String>> {
            Ok(names.to_vec())
        }
    }

    #[test]
    fn passes_when_nothing_declared() {
        let p = pkg(vec![]);
        let actions = vec![StagedAction::Install {
            pkg: &p,
            staged_archive_path: None,
        }];
        assert!(precheck(&actions, &NullProbe).is_ok());
    }

    #[test]
    fn fails_with_missing_sysdep_when_probe_reports_unmet() {
        let p = pkg(vec!["libssl"]);
        let actions = vec![StagedAction::Install {
            pkg: &p,
            staged_archive_path: None,
        }];
        let err = precheck(&actions, &AlwaysMissing).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingSysdep);
    }
}
