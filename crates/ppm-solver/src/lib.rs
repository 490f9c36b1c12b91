//! Backtracking dependency solver (spec §4.6, C7).
//!
//! Given a [`ppm_index::BinaryIndex`] and the set of packages already
//! installed, resolves install/upgrade/remove requests into an
//! [`ActionPlan`] in the order the transaction applier must carry them
//! out. The search never mutates the index itself.

#![warn(clippy::all)]

mod error;
mod frame;
mod plan;
mod solver;

pub use error::{Result, SolverError};
pub use plan::{ActionPlan, PlannedOp};
pub use solver::{plan_autoremove, plan_remove, plan_upgrade, solve};
