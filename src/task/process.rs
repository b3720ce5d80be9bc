// src/task/process.rs

//! Processing tasks: resolve a file set, run it through the configured
//! stages and write the results under `dest`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use tracing::{debug, trace, warn};

use crate::config::TaskConfig;
use crate::errors::{AssetdagError, Result};
use crate::fileset::{resolve, FilePattern};
use crate::output::write_assets;
use crate::server::ReloadKind;
use crate::stages::{build_stage, Asset, Stage};
use crate::task::{BoxFuture, RunContext, Task, TaskReport};
use crate::types::{ErrorPolicy, ReloadMode};

#[derive(Debug)]
pub struct ProcessingTask {
    name: String,
    after: Vec<String>,
    pattern: FilePattern,
    base: Option<String>,
    dest: String,
    stages: Vec<Box<dyn Stage>>,
    on_error: ErrorPolicy,
    reload: ReloadMode,
}

impl ProcessingTask {
    pub fn from_config(name: &str, cfg: &TaskConfig) -> Result<Self> {
        let dest = cfg.dest.clone().ok_or_else(|| {
            AssetdagError::ConfigError(format!("task '{name}' has no `dest` directory"))
        })?;

        Ok(Self {
            name: name.to_string(),
            after: cfg.after.clone(),
            pattern: FilePattern::new(&cfg.src)?,
            base: cfg.base.clone(),
            dest,
            stages: cfg
                .stages
                .iter()
                .map(|s| build_stage(s, cfg.sourcemaps))
                .collect(),
            on_error: cfg.on_error,
            reload: cfg.reload,
        })
    }

    async fn execute(&self, ctx: &Arc<RunContext>) -> Result<TaskReport> {
        let mut assets = {
            let ctx = Arc::clone(ctx);
            let name = self.name.clone();
            let pattern = self.pattern.clone();
            let base = self.base.clone();
            tokio::task::spawn_blocking(move || read_inputs(&ctx, &name, &pattern, base.as_deref()))
                .await
                .context("input reader panicked")??
        };

        for stage in &self.stages {
            let count = assets.len();
            assets = stage
                .apply(assets)
                .await
                .map_err(|err| AssetdagError::Stage {
                    task: self.name.clone(),
                    stage: stage.name().to_string(),
                    message: format!("{err:#}"),
                })?;
            debug!(
                task = %self.name,
                stage = stage.name(),
                before = count,
                after = assets.len(),
                "stage done"
            );
        }

        let dest = ctx.root().join(&self.dest);
        let written = {
            let fs = Arc::clone(ctx.fs());
            tokio::task::spawn_blocking(move || write_assets(fs.as_ref(), &dest, &assets))
                .await
                .context("output writer panicked")??
        };

        self.notify(ctx, &written);

        Ok(TaskReport {
            task: self.name.clone(),
            written,
            isolated_failure: None,
        })
    }

    /// Tell connected browsers about fresh output.
    fn notify(&self, ctx: &RunContext, written: &[PathBuf]) {
        if self.reload == ReloadMode::None || written.is_empty() {
            return;
        }
        let Some(reloader) = ctx.reloader() else {
            trace!(task = %self.name, "no dev server; skipping reload");
            return;
        };

        match self.reload {
            ReloadMode::Full => reloader.send(ReloadKind::Full),
            ReloadMode::Inject => {
                let server_root = ctx.server_root();
                for path in written.iter().filter(|p| is_stylesheet(p)) {
                    match url_path(&server_root, path) {
                        Some(url) => reloader.send(ReloadKind::Inject { path: url }),
                        None => reloader.send(ReloadKind::Full),
                    }
                }
            }
            ReloadMode::None => {}
        }
    }
}

/// Resolve `pattern` and load every match as an [`Asset`].
fn read_inputs(
    ctx: &RunContext,
    task: &str,
    pattern: &FilePattern,
    base: Option<&str>,
) -> Result<Vec<Asset>> {
    let files = resolve(ctx.fs().as_ref(), ctx.root(), pattern)?;
    let mut assets = Vec::with_capacity(files.len());
    for file in files {
        let contents = ctx
            .fs()
            .read(&file.path)
            .with_context(|| format!("task '{task}' reading input"))?;
        let rel = file.relative_to(base);
        trace!(task = %task, input = %file.rel, output = %rel, "queued input");
        assets.push(Asset::new(rel, contents).with_source(file.path));
    }
    Ok(assets)
}

fn is_stylesheet(path: &Path) -> bool {
    path.extension().is_some_and(|e| e == "css")
}

/// URL path of `file` as served from `server_root`.
fn url_path(server_root: &Path, file: &Path) -> Option<String> {
    let rel = file.strip_prefix(server_root).ok()?;
    Some(format!("/{}", rel.to_string_lossy().replace('\\', "/")))
}

impl Task for ProcessingTask {
    fn name(&self) -> &str {
        &self.name
    }

    fn after(&self) -> &[String] {
        &self.after
    }

    fn describe(&self) -> String {
        let stages: Vec<&str> = self.stages.iter().map(|s| s.name()).collect();
        format!(
            "process {:?} -> {} [{}]",
            self.pattern.raw(),
            self.dest,
            stages.join(", ")
        )
    }

    fn run<'a>(&'a self, ctx: &'a Arc<RunContext>) -> BoxFuture<'a, Result<TaskReport>> {
        Box::pin(async move {
            match self.execute(ctx).await {
                Err(err) if err.is_stage_failure() && self.on_error == ErrorPolicy::Isolate => {
                    warn!(
                        task = %self.name,
                        error = %err,
                        "stage failure isolated; previous output kept"
                    );
                    Ok(TaskReport {
                        task: self.name.clone(),
                        written: Vec::new(),
                        isolated_failure: Some(err.to_string()),
                    })
                }
                other => other,
            }
        })
    }
}
