//! Core types shared by every `ppm` crate: the error taxonomy (spec §7),
//! content hashing (spec §4.1, C1), and the version comparator (spec §3,
//! §8).

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
mod hash;
pub mod version;

pub use error::{Error, ErrorKind, Result};
pub use hash::{Digest256, EntryKind, TypedHash};
pub use version::Version;
