//! The solver's output: an ordered list of operations (spec C8).

use ppm_index::PackageRecord;

/// One step of an install/upgrade/remove transaction, in commit order
/// (spec §3: dependency-before-dependent for installs, dependent-
/// before-dependency for removes).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlannedOp<'idx> {
    Install { pkg: &'idx PackageRecord },
    Upgrade {
        old: &'idx PackageRecord,
        new: &'idx PackageRecord,
    },
    Remove { pkg: &'idx PackageRecord },
}

impl<'idx> PlannedOp<'idx> {
    #[must_use]
    pub fn name(&self) -> &'idx str {
        match self {
            Self::Install { pkg } | Self::Remove { pkg } => &pkg.name,
            Self::Upgrade { new, .. } => &new.name,
        }
    }
}

/// The ordered sequence of operations a solver run produced. Empty
/// plans are valid (e.g. installing a package that is already
/// satisfied).
pub type ActionPlan<'idx> = Vec<PlannedOp<'idx>>;
