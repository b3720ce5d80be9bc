// src/task/builtin.rs

//! Tasks with fixed behaviour: `clean`, `serve`, `reload` and `watch`.

use std::sync::Arc;

use anyhow::Context;
use tracing::{debug, info};

use crate::errors::Result;
use crate::output;
use crate::server::{ReloadKind, ServerSession};
use crate::task::{BoxFuture, RunContext, Task, TaskReport};
use crate::watch::WatchScheduler;

/// Deletes a directory tree (the output directory by default).
#[derive(Debug, Clone)]
pub struct CleanTask {
    name: String,
    dir: String,
    after: Vec<String>,
}

impl CleanTask {
    pub fn new(name: impl Into<String>, dir: impl Into<String>, after: Vec<String>) -> Self {
        Self {
            name: name.into(),
            dir: dir.into(),
            after,
        }
    }
}

impl Task for CleanTask {
    fn name(&self) -> &str {
        &self.name
    }

    fn after(&self) -> &[String] {
        &self.after
    }

    fn describe(&self) -> String {
        format!("clean {}", self.dir)
    }

    fn run<'a>(&'a self, ctx: &'a Arc<RunContext>) -> BoxFuture<'a, Result<TaskReport>> {
        Box::pin(async move {
            let fs = Arc::clone(ctx.fs());
            let dir = ctx.root().join(&self.dir);
            tokio::task::spawn_blocking(move || output::clean(fs.as_ref(), &dir))
                .await
                .context("clean worker panicked")??;
            Ok(TaskReport::new(&self.name))
        })
    }
}

/// Starts the dev server and stores its session in the run context.
///
/// Returns as soon as the listener is bound; the server keeps running in
/// the background for the rest of the process.
#[derive(Debug, Clone)]
pub struct ServeTask {
    name: String,
    after: Vec<String>,
}

impl ServeTask {
    pub fn new(name: impl Into<String>, after: Vec<String>) -> Self {
        Self {
            name: name.into(),
            after,
        }
    }
}

impl Task for ServeTask {
    fn name(&self) -> &str {
        &self.name
    }

    fn after(&self) -> &[String] {
        &self.after
    }

    fn describe(&self) -> String {
        "serve the output directory with live reload".to_string()
    }

    fn run<'a>(&'a self, ctx: &'a Arc<RunContext>) -> BoxFuture<'a, Result<TaskReport>> {
        Box::pin(async move {
            if let Some(session) = ctx.session() {
                debug!(addr = %session.addr(), "dev server already running");
                return Ok(TaskReport::new(&self.name));
            }

            let session = ServerSession::start(ctx.server_root(), &ctx.config().server).await?;
            let session = ctx.install_session(session)?;
            info!(url = %session.url(), "dev server listening");
            Ok(TaskReport::new(&self.name))
        })
    }
}

/// Broadcasts a full page reload to connected browsers.
#[derive(Debug, Clone)]
pub struct ReloadTask {
    name: String,
    after: Vec<String>,
}

impl ReloadTask {
    pub fn new(name: impl Into<String>, after: Vec<String>) -> Self {
        Self {
            name: name.into(),
            after,
        }
    }
}

impl Task for ReloadTask {
    fn name(&self) -> &str {
        &self.name
    }

    fn after(&self) -> &[String] {
        &self.after
    }

    fn describe(&self) -> String {
        "broadcast a full page reload".to_string()
    }

    fn run<'a>(&'a self, ctx: &'a Arc<RunContext>) -> BoxFuture<'a, Result<TaskReport>> {
        Box::pin(async move {
            match ctx.reloader() {
                Some(reloader) => reloader.send(ReloadKind::Full),
                None => debug!(task = %self.name, "no dev server; reload skipped"),
            }
            Ok(TaskReport::new(&self.name))
        })
    }
}

/// Hands control to the watch scheduler. Never completes on its own.
#[derive(Debug, Clone)]
pub struct WatchTask {
    name: String,
    after: Vec<String>,
}

impl WatchTask {
    pub fn new(name: impl Into<String>, after: Vec<String>) -> Self {
        Self {
            name: name.into(),
            after,
        }
    }
}

impl Task for WatchTask {
    fn name(&self) -> &str {
        &self.name
    }

    fn after(&self) -> &[String] {
        &self.after
    }

    fn describe(&self) -> String {
        "watch sources and re-run bindings".to_string()
    }

    fn run<'a>(&'a self, ctx: &'a Arc<RunContext>) -> BoxFuture<'a, Result<TaskReport>> {
        Box::pin(async move {
            WatchScheduler::new(Arc::clone(ctx))?.run().await?;
            Ok(TaskReport::new(&self.name))
        })
    }
}
