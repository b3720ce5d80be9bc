// src/fileset/mod.rs

//! File set resolution.
//!
//! A [`FilePattern`] is an ordered list of globs relative to the project
//! root. Entries prefixed with `!` exclude. Resolution walks the filesystem
//! fresh on every call, so a watch-triggered re-run always sees the current
//! state of the tree. Zero matches is not an error.

mod pattern;
mod resolve;

pub use pattern::{glob_parent, FilePattern, NEGATION_PREFIX};
pub use resolve::{resolve, ResolvedFile};
