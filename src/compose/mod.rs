// src/compose/mod.rs

//! Task composition.
//!
//! A [`Plan`] is a tree of task references combined in series or in
//! parallel. Series members run strictly one after another; parallel members
//! are spawned together on a `JoinSet` and the group completes once every
//! member has. A failing member does not cancel its siblings: the group
//! drains them all and then reports the first failure.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use anyhow::anyhow;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::config::PlanConfig;
use crate::errors::{AssetdagError, Result};
use crate::task::{BoxFuture, RunContext, TaskReport};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Plan {
    /// A task or pipeline, looked up by name at run time.
    Task(String),
    Series(Vec<Plan>),
    Parallel(Vec<Plan>),
}

impl Plan {
    pub fn task(name: impl Into<String>) -> Self {
        Plan::Task(name.into())
    }

    pub fn series(items: impl IntoIterator<Item = Plan>) -> Self {
        Plan::Series(items.into_iter().collect())
    }

    pub fn parallel(items: impl IntoIterator<Item = Plan>) -> Self {
        Plan::Parallel(items.into_iter().collect())
    }

    /// Run the plan, returning the reports of every task it ran.
    pub fn run(&self, ctx: &Arc<RunContext>) -> BoxFuture<'static, Result<Vec<TaskReport>>> {
        let plan = self.clone();
        let ctx = Arc::clone(ctx);
        Box::pin(async move {
            match plan {
                Plan::Task(name) => run_named(&ctx, &name).await,
                Plan::Series(items) => {
                    let mut reports = Vec::new();
                    for item in &items {
                        reports.extend(item.run(&ctx).await?);
                    }
                    Ok(reports)
                }
                Plan::Parallel(items) => run_parallel(&ctx, items).await,
            }
        })
    }
}

impl From<&PlanConfig> for Plan {
    fn from(cfg: &PlanConfig) -> Self {
        match cfg {
            PlanConfig::Name(name) => Plan::task(name),
            PlanConfig::Series { series } => Plan::series(series.iter().map(Plan::from)),
            PlanConfig::Parallel { parallel } => Plan::parallel(parallel.iter().map(Plan::from)),
        }
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (label, items) = match self {
            Plan::Task(name) => return f.write_str(name),
            Plan::Series(items) => ("series", items),
            Plan::Parallel(items) => ("parallel", items),
        };
        write!(f, "{label}[")?;
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{item}")?;
        }
        f.write_str("]")
    }
}

/// Run a task (after its declared dependencies) or expand a pipeline.
async fn run_named(ctx: &Arc<RunContext>, name: &str) -> Result<Vec<TaskReport>> {
    let registry = ctx.registry();

    let Some(task) = registry.task(name).cloned() else {
        return match registry.pipeline(name).cloned() {
            Some(plan) => {
                debug!(pipeline = name, plan = %plan, "expanding pipeline");
                plan.run(ctx).await
            }
            None => Err(AssetdagError::TaskNotFound(name.to_string())),
        };
    };

    let mut reports = Vec::new();
    for dep in task.after() {
        reports.extend(Plan::task(dep.as_str()).run(ctx).await?);
    }

    let started = Instant::now();
    info!(task = name, "task started");
    match task.run(ctx).await {
        Ok(report) => {
            info!(
                task = name,
                elapsed_ms = started.elapsed().as_millis() as u64,
                files = report.written.len(),
                "task finished"
            );
            reports.push(report);
            Ok(reports)
        }
        Err(err) => {
            error!(
                task = name,
                elapsed_ms = started.elapsed().as_millis() as u64,
                error = %err,
                "task failed"
            );
            Err(err)
        }
    }
}

async fn run_parallel(ctx: &Arc<RunContext>, items: Vec<Plan>) -> Result<Vec<TaskReport>> {
    let mut set = JoinSet::new();
    for item in items {
        set.spawn(item.run(ctx));
    }

    let mut reports = Vec::new();
    let mut first_err: Option<AssetdagError> = None;

    while let Some(joined) = set.join_next().await {
        let outcome = joined
            .map_err(|e| AssetdagError::Other(anyhow!("parallel member panicked: {e}")))
            .and_then(|r| r);
        match outcome {
            Ok(r) => reports.extend(r),
            Err(err) if first_err.is_none() => first_err = Some(err),
            Err(err) => debug!(error = %err, "additional parallel failure"),
        }
    }

    match first_err {
        Some(err) => Err(err),
        None => Ok(reports),
    }
}
