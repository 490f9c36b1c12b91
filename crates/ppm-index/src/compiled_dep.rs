//! Compiling a package's declared dependencies into concrete candidate
//! lists (spec §4.5, C4), grounded on `binindex_compile_dep()` /
//! `binindex_compile_pkgdeps()`.

use crate::index::BinaryIndex;
use crate::package::{DepSpec, PackageRecord};

/// The candidates that can satisfy one dependency edge, in descending
/// version order (the order the solver tries them in).
#[derive(Debug, Clone)]
pub struct CompiledDep<'idx> {
    pub name_id: u32,
    pub dep_name: &'idx str,
    pub candidates: Vec<&'idx PackageRecord>,
}

impl<'idx> CompiledDep<'idx> {
    /// The highest-versioned candidate, i.e. the one the solver tries
    /// first.
    #[must_use]
    pub fn first(&self) -> Option<&'idx PackageRecord> {
        self.candidates.first().copied()
    }
}

/// Resolve a single dependency spec against the index: the list of
/// known packages under `dep.name` whose version falls in `dep.range`,
/// highest version first.
#[must_use]
pub fn compile_dep<'idx>(index: &'idx BinaryIndex, dep: &DepSpec) -> Option<CompiledDep<'idx>> {
    let name_id = index.name_id(&dep.name)?;
    let candidates = index
        .packages_of(name_id)
        .iter()
        .filter(|pkg| dep.range.contains(&pkg.version))
        .collect();
    Some(CompiledDep {
        name_id,
        dep_name: index.name_of(name_id),
        candidates,
    })
}

/// Resolve every dependency declared by `pkg` into a [`CompiledDep`].
///
/// Returns `Err` with the names of dependencies absent from the index
/// entirely (spec §4.3: unmet dependency at compile time is reported,
/// not silently dropped).
pub fn compile_package_deps<'idx>(
    index: &'idx BinaryIndex,
    pkg: &PackageRecord,
) -> Result<Vec<CompiledDep<'idx>>, Vec<String>> {
    let mut compiled = Vec::with_capacity(pkg.mmpack_deps.len());
    let mut missing = Vec::new();
    for dep in &pkg.mmpack_deps {
        match compile_dep(index, dep) {
            Some(c) => compiled.push(c),
            None => missing.push(dep.name.clone()),
        }
    }
    if missing.is_empty() {
        Ok(compiled)
    } else {
        Err(missing)
    }
}

/// Resolve the candidates that would satisfy an in-place upgrade of
/// `current`: same name, any version strictly greater.
#[must_use]
pub fn compile_upgrade<'idx>(
    index: &'idx BinaryIndex,
    current: &PackageRecord,
) -> Option<CompiledDep<'idx>> {
    let name_id = current.name_id;
    let candidates = index
        .packages_of(name_id)
        .iter()
        .filter(|pkg| {
            ppm_core::version::compare(pkg.version.as_str(), current.version.as_str())
                == std::cmp::Ordering::Greater
        })
        .collect();
    Some(CompiledDep {
        name_id,
        dep_name: index.name_of(name_id),
        candidates,
    })
}
