// src/task/mod.rs

//! Tasks: the named units that pipelines compose.
//!
//! Every task is built once at startup from its `[task.<name>]` table and
//! stored in the [`TaskRegistry`]. Invoking a task returns a future that
//! resolves to a [`TaskReport`]; composition in [`crate::compose`] awaits
//! these handles.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::errors::Result;
pub use crate::stages::BoxFuture;

pub mod builtin;
pub mod context;
pub mod process;
pub mod registry;

pub use builtin::{CleanTask, ReloadTask, ServeTask, WatchTask};
pub use context::RunContext;
pub use process::ProcessingTask;
pub use registry::TaskRegistry;

/// Outcome of one task invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskReport {
    pub task: String,
    /// Files written, including source maps.
    pub written: Vec<PathBuf>,
    /// Set when a stage failure was logged and suppressed.
    pub isolated_failure: Option<String>,
}

impl TaskReport {
    pub fn new(task: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            ..Self::default()
        }
    }
}

pub trait Task: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// Tasks run in sequence before this one whenever it is invoked.
    fn after(&self) -> &[String] {
        &[]
    }

    /// One-line summary for `--dry-run`.
    fn describe(&self) -> String;

    fn run<'a>(&'a self, ctx: &'a Arc<RunContext>) -> BoxFuture<'a, Result<TaskReport>>;
}
