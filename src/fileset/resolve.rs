// src/fileset/resolve.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::{debug, trace};

use crate::errors::Result;
use crate::fileset::pattern::FilePattern;
use crate::fs::FileSystem;

/// A file selected by a [`FilePattern`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFile {
    /// Path on disk (`root` joined with `rel`).
    pub path: PathBuf,
    /// Path relative to the project root, forward slashes.
    pub rel: String,
    /// Glob parent of the inclusion that selected this file.
    pub glob_base: String,
}

impl ResolvedFile {
    /// Path relative to `base` (or to the glob parent when `base` is `None`),
    /// which is where the file lands under a task's destination directory.
    ///
    /// A file outside an explicit `base` keeps its root-relative path.
    pub fn relative_to(&self, base: Option<&str>) -> String {
        let base = base.unwrap_or(&self.glob_base).trim_matches('/');
        if base.is_empty() {
            return self.rel.clone();
        }
        match self.rel.strip_prefix(base) {
            Some(rest) if rest.starts_with('/') => rest[1..].to_string(),
            _ => self.rel.clone(),
        }
    }
}

fn to_rel_str(root: &Path, path: &Path) -> Option<String> {
    path.strip_prefix(root)
        .ok()
        .map(|rel| rel.to_string_lossy().replace('\\', "/"))
}

/// Resolve `pattern` against `root`.
///
/// Each inclusion is walked from its literal base directory. A base that
/// does not exist is a pattern miss, not an error; an unreadable directory
/// is. The result is de-duplicated (first matching inclusion wins) and
/// sorted by relative path so repeated calls on a static tree agree.
pub fn resolve(fs: &dyn FileSystem, root: &Path, pattern: &FilePattern) -> Result<Vec<ResolvedFile>> {
    let mut found: BTreeMap<String, ResolvedFile> = BTreeMap::new();

    for inclusion in pattern.inclusions() {
        let start = if inclusion.base.is_empty() {
            root.to_path_buf()
        } else {
            root.join(&inclusion.base)
        };

        if !fs.is_dir(&start) {
            trace!(pattern = %inclusion.raw, base = ?start, "glob base missing; no matches");
            continue;
        }

        let mut stack = vec![start];
        while let Some(dir) = stack.pop() {
            let entries = fs
                .read_dir(&dir)
                .with_context(|| format!("resolving pattern {}", inclusion.raw))?;

            for path in entries {
                if fs.is_dir(&path) {
                    stack.push(path);
                    continue;
                }
                if !fs.is_file(&path) {
                    continue;
                }
                let Some(rel) = to_rel_str(root, &path) else {
                    continue;
                };
                if found.contains_key(&rel) || pattern.is_excluded(&rel) {
                    continue;
                }
                if inclusion.matcher.is_match(&rel) {
                    found.insert(
                        rel.clone(),
                        ResolvedFile {
                            path,
                            rel,
                            glob_base: inclusion.base.clone(),
                        },
                    );
                }
            }
        }
    }

    debug!(patterns = ?pattern.raw(), matched = found.len(), "resolved file set");
    Ok(found.into_values().collect())
}
