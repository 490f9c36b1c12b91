//! Processing frames and the journal entries the backtracking search
//! walks, grounded on `struct proc_frame` / `struct planned_op` /
//! `struct decision_state` in `action-solver.c`.
//!
//! The original keeps these in raw growable buffers and undoes a
//! branch by pointer arithmetic so it can free arenas by hand; here
//! every frame owns its arena directly (`Vec<CompiledDep>`), so
//! abandoning a branch is just dropping a `Vec<Frame>` snapshot — Rust
//! frees the arenas for us, and there is no separate "upgrades stack"
//! to track for cleanup.

use ppm_index::{CompiledDep, PackageRecord};

/// Where a frame is in the per-iteration dispatch (spec §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FrameState {
    Validation,
    Selection,
    UpgradeRdeps,
    /// First visit to INSTALL_DEPS: the candidate is staged but not
    /// yet committed. Spawns a child frame over its dependencies and
    /// waits for that frame to finish before committing, so commit
    /// happens in post-order (dependencies before dependent).
    InstallDepsSpawn,
    /// Second visit, reached after the spawned child frame (if any)
    /// is fully walked: actually move the candidate from `stage_lut`
    /// into `inst_lut` and journal it.
    InstallDepsCommit,
    Next,
}

/// One level of the processing stack: a dependency arena being walked
/// element by element, with the current element's candidate index.
#[derive(Debug, Clone)]
pub(crate) struct Frame<'idx> {
    pub deps: Vec<CompiledDep<'idx>>,
    pub dep_idx: usize,
    pub candidate_idx: usize,
    pub upgrade_mode: bool,
    pub state: FrameState,
}

impl<'idx> Frame<'idx> {
    pub fn new(deps: Vec<CompiledDep<'idx>>, upgrade_mode: bool) -> Self {
        Self {
            deps,
            dep_idx: 0,
            candidate_idx: 0,
            upgrade_mode,
            state: FrameState::Validation,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.dep_idx >= self.deps.len()
    }

    pub fn current(&self) -> &CompiledDep<'idx> {
        &self.deps[self.dep_idx]
    }
}

/// A single mutation to `inst_lut`/`stage_lut`, journaled so any
/// prefix of the journal can be undone (spec §4.6 invariants).
#[derive(Debug, Clone, Copy)]
pub(crate) enum JournalEntry<'idx> {
    Stage {
        id: u32,
        pkg: &'idx PackageRecord,
    },
    Install {
        id: u32,
        pkg: &'idx PackageRecord,
    },
    Remove {
        id: u32,
        pkg: &'idx PackageRecord,
    },
    Upgrade {
        id: u32,
        old: &'idx PackageRecord,
        new: &'idx PackageRecord,
    },
}

/// A snapshot taken at the moment a choice point is entered, to be
/// restored wholesale on backtrack.
#[derive(Debug, Clone)]
pub(crate) struct Decision<'idx> {
    pub ops_len: usize,
    pub frames: Vec<Frame<'idx>>,
}
