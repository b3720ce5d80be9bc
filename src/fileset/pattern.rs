// src/fileset/pattern.rs

use std::fmt;

use globset::{Glob, GlobBuilder, GlobMatcher, GlobSet, GlobSetBuilder};

use crate::errors::Result;

/// Marker that turns a pattern into an exclusion.
pub const NEGATION_PREFIX: char = '!';

/// One inclusion glob plus the literal directory it is anchored at.
#[derive(Clone)]
pub(crate) struct Inclusion {
    pub(crate) raw: String,
    /// Leading path components without glob metacharacters
    /// (`source/img/**/*.png` -> `source/img`).
    pub(crate) base: String,
    pub(crate) matcher: GlobMatcher,
}

/// Compiled inclusion/exclusion globs.
///
/// Paths handed to [`FilePattern::matches`] are relative to the project root
/// and use forward slashes, e.g. `"source/css/style.css"`. `*` does not cross
/// directory separators; `**` does.
#[derive(Clone)]
pub struct FilePattern {
    raw: Vec<String>,
    includes: Vec<Inclusion>,
    exclude_set: Option<GlobSet>,
}

impl fmt::Debug for FilePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilePattern")
            .field("raw", &self.raw)
            .finish_non_exhaustive()
    }
}

fn compile(pattern: &str) -> Result<Glob> {
    Ok(GlobBuilder::new(pattern).literal_separator(true).build()?)
}

fn normalize(pattern: &str) -> &str {
    pattern.trim().trim_start_matches("./")
}

impl FilePattern {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let mut includes = Vec::new();
        let mut excludes = GlobSetBuilder::new();
        let mut exclude_count = 0usize;

        for pattern in patterns {
            let pattern = pattern.as_ref().trim();
            if let Some(negated) = pattern.strip_prefix(NEGATION_PREFIX) {
                excludes.add(compile(normalize(negated))?);
                exclude_count += 1;
            } else {
                let pattern = normalize(pattern);
                includes.push(Inclusion {
                    raw: pattern.to_string(),
                    base: glob_parent(pattern),
                    matcher: compile(pattern)?.compile_matcher(),
                });
            }
        }

        let exclude_set = if exclude_count == 0 {
            None
        } else {
            Some(excludes.build()?)
        };

        Ok(Self {
            raw: patterns.iter().map(|p| p.as_ref().to_string()).collect(),
            includes,
            exclude_set,
        })
    }

    /// The patterns as written.
    pub fn raw(&self) -> &[String] {
        &self.raw
    }

    pub fn is_empty(&self) -> bool {
        self.includes.is_empty()
    }

    pub fn is_excluded(&self, rel_path: &str) -> bool {
        self.exclude_set
            .as_ref()
            .is_some_and(|set| set.is_match(rel_path))
    }

    /// First inclusion matching `rel_path`, unless excluded.
    pub(crate) fn matching_inclusion(&self, rel_path: &str) -> Option<&Inclusion> {
        if self.is_excluded(rel_path) {
            return None;
        }
        self.includes.iter().find(|inc| inc.matcher.is_match(rel_path))
    }

    /// True if `rel_path` matches at least one inclusion and no exclusion.
    pub fn matches(&self, rel_path: &str) -> bool {
        self.matching_inclusion(rel_path).is_some()
    }

    pub(crate) fn inclusions(&self) -> &[Inclusion] {
        &self.includes
    }
}

fn has_glob_meta(component: &str) -> bool {
    component.contains(['*', '?', '[', ']', '{', '}'])
}

/// Literal directory prefix of a glob.
///
/// `source/img/**/*.png` -> `source/img`, `source/*.html` -> `source`,
/// `source/css/style.css` -> `source/css`, `*.ico` -> `""`.
pub fn glob_parent(pattern: &str) -> String {
    let components: Vec<&str> = pattern.split('/').collect();
    let literal: Vec<&str> = components
        .iter()
        .take_while(|c| !has_glob_meta(c))
        .copied()
        .collect();

    // A fully literal pattern names a file; its parent is the base.
    let take = if literal.len() == components.len() {
        literal.len().saturating_sub(1)
    } else {
        literal.len()
    };

    components[..take].join("/")
}
