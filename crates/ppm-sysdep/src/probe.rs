//! The probe seam itself.

use ppm_core::Result;

/// Something that can tell which system-package names are missing on
/// the host. Implementations talk to whatever package database the
/// platform has (dpkg, rpm, pacman, ...); the core only ever sees this
/// trait.
pub trait SysdepProbe {
    /// Given the `sys_deps` strings aggregated from every INSTALL/
    /// UPGRADE target (spec §4.7 step 1), return the subset that is
    /// not satisfied on the host, in the order they were given.
    ///
    /// # Errors
    /// Returns an error if the probe itself could not be run (e.g. the
    /// underlying package-manager binary is missing).
    fn missing(&self, names: &[String]) -> Result<Vec<String>>;
}

/// A probe that never reports anything missing. Used when the caller
/// has no system-dependency concept to check against (tests, or
/// platforms with no package database at all).
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProbe;

impl SysdepProbe for NullProbe {
    fn missing(&self, _names: &[String]) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_probe_reports_nothing_missing() {
        let probe = NullProbe;
        let names = vec!["libc6".to_string(), "libssl3".to_string()];
        assert!(probe.missing(&names).unwrap().is_empty());
    }
}
