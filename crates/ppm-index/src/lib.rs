//! Package records, the binary index, and dependency compilation
//! (spec §4.3-§4.5, C4/C5).

#![warn(clippy::all)]

mod compiled_dep;
mod index;
mod package;
mod parse;

pub use compiled_dep::{compile_dep, compile_package_deps, compile_upgrade, CompiledDep};
pub use index::BinaryIndex;
pub use package::{DepSpec, PackageRecord, RemoteResource, VersionRange};
pub use parse::{format_installed_record, parse_index, parse_installed_list};
