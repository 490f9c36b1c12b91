//! The applier's own view of a plan entry (spec §4.7), grounded on
//! [`ppm_solver::PlannedOp`] but carrying the mutable `staged_archive_path`
//! the fetch step fills in before any action runs.

use ppm_index::PackageRecord;
use std::path::PathBuf;

/// One operation of a transaction, with its archive location once the
/// fetch step has resolved it.
#[derive(Debug, Clone)]
pub enum StagedAction<'idx> {
    Install {
        pkg: &'idx PackageRecord,
        staged_archive_path: Option<PathBuf>,
    },
    Upgrade {
        old: &'idx PackageRecord,
        new: &'idx PackageRecord,
        staged_archive_path: Option<PathBuf>,
    },
    Remove {
        pkg: &'idx PackageRecord,
    },
}

impl<'idx> StagedAction<'idx> {
    #[must_use]
    pub fn name(&self) -> &'idx str {
        match self {
            Self::Install { pkg, .. } | Self::Remove { pkg } => &pkg.name,
            Self::Upgrade { new, .. } => &new.name,
        }
    }
}

/// Lift a solver plan into the applier's own action list, with no
/// archive resolved yet (spec §4.7 step 2 fills that in).
#[must_use]
pub fn stage_plan<'idx>(plan: &ppm_solver::ActionPlan<'idx>) -> Vec<StagedAction<'idx>> {
    plan.iter()
        .map(|op| match op {
            ppm_solver::PlannedOp::Install { pkg } => StagedAction::Install {
                pkg: *pkg,
                staged_archive_path: None,
            },
            ppm_solver::PlannedOp::Upgrade { old, new } => StagedAction::Upgrade {
                old: *old,
                new: *new,
                staged_archive_path: None,
            },
            ppm_solver::PlannedOp::Remove { pkg } => StagedAction::Remove { pkg: *pkg },
        })
        .collect()
}

/// The outcome of a single package's integrity check (spec §4.8).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityStatus {
    Ok,
    Fail { bad_paths: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrityReport {
    pub name: String,
    pub status: IntegrityStatus,
}
