//! Reference [`SysdepProbe`] implementation that shells out to
//! whichever host package manager is present.

use crate::probe::SysdepProbe;
use ppm_core::Result;
use std::process::Command;
use tracing::debug;

/// Which host package database to query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Debian/Ubuntu, via `dpkg-query`.
    Dpkg,
    /// Fedora/RHEL/openSUSE, via `rpm`.
    Rpm,
    /// Arch, via `pacman`.
    Pacman,
}

impl Backend {
    /// Check a single name's presence; `true` means installed. A
    /// missing backend binary is treated the same as a failed query
    /// rather than an error, same as `PlatformValidator::detect_php_version`
    /// treats `php` not being on `PATH` as "not detected".
    fn is_installed(self, name: &str) -> bool {
        let (program, args): (&str, Vec<&str>) = match self {
            Self::Dpkg => ("dpkg-query", vec!["-W", "-f=${Status}", name]),
            Self::Rpm => ("rpm", vec!["-q", name]),
            Self::Pacman => ("pacman", vec!["-Q", name]),
        };
        match Command::new(program).args(&args).output() {
            Ok(output) => output.status.success(),
            Err(e) => {
                debug!(program, error = %e, "sysdep backend not available");
                false
            }
        }
    }
}

/// Probes the host's native package database by shelling out to
/// `dpkg-query`, `rpm`, or `pacman`, one process per name. This is a
/// reference implementation (spec §9.2 scopes full host introspection
/// out); a production deployment would likely batch the query.
#[derive(Debug, Clone, Copy)]
pub struct ShellOutProbe {
    backend: Backend,
}

impl ShellOutProbe {
    #[must_use]
    pub const fn new(backend: Backend) -> Self {
        Self { backend }
    }
}

impl SysdepProbe for ShellOutProbe {
    fn missing(&self, names: &[String]) -> Result<Vec<String>> {
        let mut missing = Vec::new();
        for name in names {
            if !self.backend.is_installed(name) {
                debug!(name, "system dependency not satisfied");
                missing.push(name.clone());
            }
        }
        Ok(missing)
    }
}
