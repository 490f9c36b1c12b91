//! System-package dependency probing (spec §4.7 step 1, C10).
//!
//! The transaction applier aggregates every target's `sys_deps` and
//! asks a probe which of those opaque strings are unmet on the host.
//! The probe itself is kept behind a trait so the core never shells
//! out directly and tests never depend on a real package database.

#![warn(clippy::all)]

mod probe;
mod shell_out;

pub use probe::{NullProbe, SysdepProbe};
pub use shell_out::ShellOutProbe;
