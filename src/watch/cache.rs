// src/watch/cache.rs

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::trace;

use crate::fs::FileSystem;

/// Last seen content hash per file.
///
/// Editors and notify backends often report several events for one save
/// (data write, metadata, rename-over). Only the first one with new content
/// counts as a change.
#[derive(Debug, Default)]
pub struct ContentCache {
    hashes: HashMap<PathBuf, blake3::Hash>,
}

impl ContentCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the current state of `path`; returns whether it differs from
    /// the last observation. Unreadable or missing files always count as
    /// changed (deletions matter too).
    pub fn observe(&mut self, fs: &dyn FileSystem, path: &Path) -> bool {
        if !fs.is_file(path) {
            self.hashes.remove(path);
            return true;
        }
        let Ok(contents) = fs.read(path) else {
            self.hashes.remove(path);
            return true;
        };

        let hash = blake3::hash(&contents);
        match self.hashes.insert(path.to_path_buf(), hash) {
            Some(previous) if previous == hash => {
                trace!(path = ?path, "content unchanged; event dropped");
                false
            }
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    #[test]
    fn identical_content_is_not_a_change() {
        let fs = MockFileSystem::new();
        let path = Path::new("./source/a.css");
        fs.add_file(path, b"a{}".to_vec());

        let mut cache = ContentCache::new();
        assert!(cache.observe(&fs, path));
        assert!(!cache.observe(&fs, path));

        fs.add_file(path, b"b{}".to_vec());
        assert!(cache.observe(&fs, path));
    }

    #[test]
    fn missing_file_counts_as_change() {
        let fs = MockFileSystem::new();
        let mut cache = ContentCache::new();
        assert!(cache.observe(&fs, Path::new("./gone.css")));
        assert!(cache.observe(&fs, Path::new("./gone.css")));
    }
}
