//! The backtracking search itself (spec §4.6, C7), grounded on the
//! `VALIDATION → SELECTION → UPGRADE_RDEPS → INSTALL_DEPS → NEXT →
//! BACKTRACK` state machine of `action-solver.c`.
//!
//! One detail that only shows up by reading the C dispatcher closely:
//! a candidate's own INSTALL/UPGRADE journal entry is written only
//! *after* its dependency frame has been fully walked
//! (`solver_commit_pkg_install` is called from the generic resume
//! path, not from `solver_step_install_deps` itself). That is what
//! gives the journal its dependency-before-dependent order with no
//! extra sorting pass, so INSTALL_DEPS is split into two frame states
//! here: spawn (push the dependency frame) and commit (run once that
//! frame is done).

use crate::error::{Result, SolverError};
use crate::frame::{Decision, Frame, FrameState, JournalEntry};
use crate::plan::{ActionPlan, PlannedOp};
use ppm_index::{compile_dep, compile_package_deps, compile_upgrade, BinaryIndex, DepSpec, PackageRecord};
use tracing::{debug, trace};

/// Owns the tentative/committed install tables and the undo journal
/// for one solver run. Borrows the index for its whole lifetime: the
/// index is never mutated while solving.
pub(crate) struct Solver<'idx> {
    index: &'idx BinaryIndex,
    inst_lut: Vec<Option<&'idx PackageRecord>>,
    stage_lut: Vec<Option<&'idx PackageRecord>>,
    processing_stack: Vec<Frame<'idx>>,
    decision_stack: Vec<Decision<'idx>>,
    ops_stack: Vec<JournalEntry<'idx>>,
}

impl<'idx> Solver<'idx> {
    /// Build a solver seeded with the packages currently installed
    /// (spec §4.4's `fill_lookup`): every name in `installed` becomes
    /// the initial content of `inst_lut`.
    fn new(index: &'idx BinaryIndex, installed: &[&'idx PackageRecord]) -> Self {
        let mut inst_lut = vec![None; index.num_names()];
        for &pkg in installed {
            inst_lut[pkg.name_id as usize] = Some(pkg);
        }
        Self {
            index,
            inst_lut,
            stage_lut: vec![None; index.num_names()],
            processing_stack: Vec::new(),
            decision_stack: Vec::new(),
            ops_stack: Vec::new(),
        }
    }

    fn effective(&self, id: u32) -> Option<&'idx PackageRecord> {
        self.stage_lut[id as usize].or(self.inst_lut[id as usize])
    }

    /// Run the state machine to completion, producing the final
    /// action plan from the journal's non-transient entries, in
    /// journal order (already dependency-before-dependent; spec §3).
    fn run(&mut self) -> Result<ActionPlan<'idx>> {
        loop {
            let Some(mut frame) = self.processing_stack.pop() else {
                break;
            };
            if frame.is_exhausted() {
                continue;
            }

            match frame.state {
                FrameState::Validation => self.step_validation(frame)?,
                FrameState::Selection => self.step_selection(frame)?,
                FrameState::UpgradeRdeps => self.step_upgrade_rdeps(frame)?,
                FrameState::InstallDepsSpawn => self.step_install_deps_spawn(frame)?,
                FrameState::InstallDepsCommit => self.step_install_deps_commit(frame),
                FrameState::Next => {
                    frame.dep_idx += 1;
                    if !frame.is_exhausted() {
                        frame.candidate_idx = 0;
                        frame.state = FrameState::Validation;
                        self.processing_stack.push(frame);
                    }
                }
            }
        }

        Ok(self
            .ops_stack
            .iter()
            .filter_map(|entry| match *entry {
                JournalEntry::Install { pkg, .. } => Some(PlannedOp::Install { pkg }),
                JournalEntry::Upgrade { old, new, .. } => Some(PlannedOp::Upgrade { old, new }),
                JournalEntry::Remove { pkg, .. } => Some(PlannedOp::Remove { pkg }),
                JournalEntry::Stage { .. } => None,
            })
            .collect())
    }

    fn step_validation(&mut self, mut frame: Frame<'idx>) -> Result<()> {
        let dep = frame.current();
        let name_id = dep.name_id;

        if let Some(staged) = self.stage_lut[name_id as usize] {
            if satisfies(dep, staged) {
                frame.state = FrameState::Next;
                self.processing_stack.push(frame);
            } else {
                self.backtrack()?;
            }
            return Ok(());
        }

        if let Some(installed) = self.inst_lut[name_id as usize] {
            if satisfies(dep, installed) && !frame.upgrade_mode {
                frame.state = FrameState::Next;
                self.processing_stack.push(frame);
                return Ok(());
            }
        }

        frame.candidate_idx = 0;
        frame.state = FrameState::Selection;
        self.processing_stack.push(frame);
        Ok(())
    }

    fn step_selection(&mut self, mut frame: Frame<'idx>) -> Result<()> {
        let (name_id, cand, previously_installed) = {
            let dep = frame.current();
            (
                dep.name_id,
                dep.candidates[frame.candidate_idx],
                self.inst_lut[dep.name_id as usize],
            )
        };

        if let Some(old) = previously_installed {
            if old.identity_key() == cand.identity_key() {
                frame.state = FrameState::Next;
                self.processing_stack.push(frame);
                return Ok(());
            }
        }

        let has_more_candidates = frame.candidate_idx + 1 < frame.current().candidates.len();
        if has_more_candidates {
            let mut snapshot = self.processing_stack.clone();
            snapshot.push(frame.clone());
            self.decision_stack.push(Decision {
                ops_len: self.ops_stack.len(),
                frames: snapshot,
            });
        }

        trace!(name = %cand.name, version = %cand.version.as_str(), "staging candidate");
        self.stage_lut[name_id as usize] = Some(cand);
        self.ops_stack.push(JournalEntry::Stage { id: name_id, pkg: cand });

        frame.state = if previously_installed.is_some() {
            FrameState::UpgradeRdeps
        } else {
            FrameState::InstallDepsSpawn
        };
        self.processing_stack.push(frame);
        Ok(())
    }

    fn step_upgrade_rdeps(&mut self, mut frame: Frame<'idx>) -> Result<()> {
        let name_id = frame.current().name_id;
        let new_pkg = self.stage_lut[name_id as usize].expect("staged in SELECTION");

        let mut extra = Vec::new();
        let mut blocked = false;
        for &rdep_id in self.index.rdeps_of(name_id) {
            let Some(rdep) = self.effective(rdep_id) else {
                continue;
            };
            let Some(dep_spec) = declared_dep_on(rdep, self.index, name_id) else {
                continue;
            };
            if dep_spec.range.contains(&new_pkg.version) {
                continue;
            }
            if self.stage_lut[rdep_id as usize].is_some() {
                blocked = true;
                break;
            }
            match compile_upgrade(self.index, rdep) {
                Some(compiled) if !compiled.candidates.is_empty() => extra.push(compiled),
                _ => {
                    blocked = true;
                    break;
                }
            }
        }

        if blocked {
            debug!(name_id, "reverse dependency cannot be patched, backtracking");
            self.backtrack()?;
            return Ok(());
        }

        frame.state = FrameState::InstallDepsSpawn;
        self.processing_stack.push(frame);
        if !extra.is_empty() {
            self.processing_stack.push(Frame::new(extra, true));
        }
        Ok(())
    }

    /// First visit to install-deps: compile the staged candidate's own
    /// dependencies and push a child frame to walk them. The candidate
    /// stays in `stage_lut` until [`Self::step_install_deps_commit`]
    /// runs, which only happens once that child frame is exhausted.
    fn step_install_deps_spawn(&mut self, mut frame: Frame<'idx>) -> Result<()> {
        let name_id = frame.current().name_id;
        let cand = self.stage_lut[name_id as usize].expect("staged in SELECTION");
        let upgrade_mode = frame.upgrade_mode;

        match compile_package_deps(self.index, cand) {
            Ok(child_deps) => {
                frame.state = FrameState::InstallDepsCommit;
                self.processing_stack.push(frame);
                if !child_deps.is_empty() {
                    self.processing_stack.push(Frame::new(child_deps, upgrade_mode));
                }
                Ok(())
            }
            Err(_missing) => {
                debug!(name = %cand.name, "candidate has unresolved dependencies, backtracking");
                self.backtrack()
            }
        }
    }

    /// Second visit: the candidate's dependencies are all installed,
    /// so commit it and journal the change.
    fn step_install_deps_commit(&mut self, mut frame: Frame<'idx>) {
        let name_id = frame.current().name_id;
        let cand = self.stage_lut[name_id as usize]
            .take()
            .expect("still staged pending commit");
        let old = self.inst_lut[name_id as usize].replace(cand);

        match old {
            Some(old_pkg) => self.ops_stack.push(JournalEntry::Upgrade {
                id: name_id,
                old: old_pkg,
                new: cand,
            }),
            None => self
                .ops_stack
                .push(JournalEntry::Install { id: name_id, pkg: cand }),
        }

        frame.state = FrameState::Next;
        self.processing_stack.push(frame);
    }

    fn backtrack(&mut self) -> Result<()> {
        let Some(decision) = self.decision_stack.pop() else {
            return Err(SolverError::Unsatisfiable);
        };
        for entry in self.ops_stack.drain(decision.ops_len..).rev() {
            match entry {
                JournalEntry::Stage { id, .. } => self.stage_lut[id as usize] = None,
                JournalEntry::Install { id, .. } => self.inst_lut[id as usize] = None,
                JournalEntry::Remove { id, pkg } => self.inst_lut[id as usize] = Some(pkg),
                JournalEntry::Upgrade { id, old, .. } => self.inst_lut[id as usize] = Some(old),
            }
        }
        self.processing_stack = decision.frames;
        let top = self
            .processing_stack
            .last_mut()
            .expect("a decision always snapshots at least the deciding frame");
        top.candidate_idx += 1;
        top.state = FrameState::Selection;
        Ok(())
    }
}

fn satisfies(dep: &ppm_index::CompiledDep<'_>, pkg: &PackageRecord) -> bool {
    dep.candidates.iter().any(|c| c.identity_key() == pkg.identity_key())
}

fn declared_dep_on<'a>(pkg: &'a PackageRecord, index: &BinaryIndex, name_id: u32) -> Option<&'a DepSpec> {
    pkg.mmpack_deps
        .iter()
        .find(|d| index.name_id(&d.name) == Some(name_id))
}

/// Resolve `requests` (each an admissible-version dependency) against
/// `index`, given the packages already installed, producing an
/// install/upgrade plan or `UNSATISFIABLE` (spec §4.6).
pub fn solve<'idx>(
    index: &'idx BinaryIndex,
    installed: &[&'idx PackageRecord],
    requests: &[DepSpec],
    upgrade_mode: bool,
) -> Result<ActionPlan<'idx>> {
    let mut deps = Vec::with_capacity(requests.len());
    for req in requests {
        match compile_dep(index, req) {
            Some(compiled) if !compiled.candidates.is_empty() => deps.push(compiled),
            _ => {
                return Err(SolverError::NotFound {
                    name: req.name.clone(),
                })
            }
        }
    }

    let mut solver = Solver::new(index, installed);
    solver.processing_stack.push(Frame::new(deps, upgrade_mode));
    solver.run()
}

/// Build an upgrade plan for `names`: each must already be installed;
/// only candidates strictly newer than the installed version are
/// considered (spec §4.6 "Upgrade"). Names already at their newest
/// known version contribute nothing and are silently skipped.
pub fn plan_upgrade<'idx>(
    index: &'idx BinaryIndex,
    installed: &[&'idx PackageRecord],
    names: &[String],
) -> Result<ActionPlan<'idx>> {
    let mut deps = Vec::new();
    for name in names {
        let current = installed
            .iter()
            .find(|p| p.name == *name)
            .copied()
            .ok_or_else(|| SolverError::NotFound { name: name.clone() })?;
        if let Some(compiled) = compile_upgrade(index, current) {
            if !compiled.candidates.is_empty() {
                deps.push(compiled);
            }
        }
    }

    if deps.is_empty() {
        return Ok(Vec::new());
    }

    let mut solver = Solver::new(index, installed);
    solver.processing_stack.push(Frame::new(deps, true));
    solver.run()
}

/// Remove `names` and, recursively, everything installed that
/// declares a dependency on them (spec §4.6 "Removal"). Unlike
/// install/upgrade this never backtracks: it is a straight recursive
/// walk over the currently-installed set.
pub fn plan_remove<'idx>(
    index: &'idx BinaryIndex,
    installed: &[&'idx PackageRecord],
    names: &[String],
) -> Result<ActionPlan<'idx>> {
    let mut inst_lut: Vec<Option<&'idx PackageRecord>> = vec![None; index.num_names()];
    for &pkg in installed {
        inst_lut[pkg.name_id as usize] = Some(pkg);
    }

    let mut ops = Vec::new();
    for name in names {
        let name_id = index
            .name_id(name)
            .ok_or_else(|| SolverError::NotFound { name: name.clone() })?;
        remove_pkgname(index, &mut inst_lut, name_id, &mut ops);
    }
    Ok(ops)
}

fn remove_pkgname<'idx>(
    index: &'idx BinaryIndex,
    inst_lut: &mut [Option<&'idx PackageRecord>],
    name_id: u32,
    ops: &mut ActionPlan<'idx>,
) {
    let Some(pkg) = inst_lut[name_id as usize].take() else {
        return;
    };

    for &rdep_id in index.rdeps_of(name_id) {
        let still_depends = inst_lut[rdep_id as usize]
            .is_some_and(|rdep| declared_dep_on(rdep, index, name_id).is_some());
        if still_depends {
            remove_pkgname(index, inst_lut, rdep_id, ops);
        }
    }

    ops.push(PlannedOp::Remove { pkg });
}

/// Plan the removal of every installed package that is not
/// manually-installed and has no remaining installed reverse
/// dependency (spec §9.1, `mmpack-autoremove`): a thin composition
/// over [`plan_remove`], not a new algorithm.
#[must_use]
pub fn plan_autoremove<'idx>(
    index: &'idx BinaryIndex,
    installed: &[&'idx PackageRecord],
    manually_installed: &[String],
) -> ActionPlan<'idx> {
    let installed_names: std::collections::HashSet<&str> =
        installed.iter().map(|p| p.name.as_str()).collect();

    let orphans: Vec<String> = installed
        .iter()
        .filter(|pkg| !manually_installed.iter().any(|m| m == &pkg.name))
        .filter(|pkg| {
            index
                .rdeps_of(pkg.name_id)
                .iter()
                .all(|&rid| !installed_names.contains(index.name_of(rid)))
        })
        .map(|pkg| pkg.name.clone())
        .collect();

    plan_remove(index, installed, &orphans).unwrap_or_default()
}
