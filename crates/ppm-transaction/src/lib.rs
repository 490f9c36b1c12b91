//! Stage-then-commit transaction applier (spec §4.7-§4.8, C9).
//!
//! Consumes a [`ppm_solver::ActionPlan`], resolves archives through
//! the cache, then mutates a prefix's filesystem and install state one
//! action at a time, in the plan's own order (spec §5: action-plan
//! order is commit order).

#![warn(clippy::all)]

mod apply;
mod fetch;
mod integrity;
mod precheck;
mod types;

pub use apply::Applier;
pub use fetch::fetch_all;
pub use integrity::{check_installed, fix_broken};
pub use precheck::precheck;
pub use types::{stage_plan, IntegrityReport, IntegrityStatus, StagedAction};
