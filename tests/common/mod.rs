#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use assetdag::config::ConfigFile;
use assetdag::fs::RealFileSystem;
use assetdag::task::{RunContext, TaskRegistry};
use assetdag_test_utils::builders::{ConfigFileBuilder, TaskConfigBuilder};
use assetdag::config::TaskKind;

pub use assetdag_test_utils::{init_tracing, with_timeout, write_file};

/// Minimal valid config for tests that register fake tasks by hand.
pub fn placeholder_config() -> ConfigFile {
    ConfigFileBuilder::new()
        .with_task("clean", TaskConfigBuilder::kind(TaskKind::Clean).build())
        .build()
}

/// Context over a real directory with a hand-built registry.
pub fn context_with(root: &Path, registry: TaskRegistry) -> Arc<RunContext> {
    RunContext::with_registry(root, Arc::new(RealFileSystem), placeholder_config(), registry)
}

/// Context over a real directory, registry built from `config`.
pub fn context_from(root: &Path, config: ConfigFile) -> Arc<RunContext> {
    RunContext::new(root, Arc::new(RealFileSystem), config).expect("build run context")
}

/// Sorted list of every file under `dir`, relative, forward slashes.
pub fn tree(dir: &Path) -> Vec<String> {
    fn walk(base: &Path, dir: &Path, out: &mut Vec<String>) {
        let Ok(entries) = std::fs::read_dir(dir) else {
            return;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                walk(base, &path, out);
            } else {
                let rel = path.strip_prefix(base).unwrap();
                out.push(rel.to_string_lossy().replace('\\', "/"));
            }
        }
    }
    let mut out = Vec::new();
    walk(dir, dir, &mut out);
    out.sort();
    out
}
