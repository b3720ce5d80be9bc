// src/lib.rs

pub mod cli;
pub mod compose;
pub mod config;
pub mod errors;
pub mod fileset;
pub mod fs;
pub mod logging;
pub mod output;
pub mod server;
pub mod stages;
pub mod task;
pub mod types;
pub mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use crate::cli::CliArgs;
use crate::config::{default_config_path, load_or_builtin};
use crate::errors::Result;
use crate::fs::RealFileSystem;
use crate::task::{RunContext, TaskReport};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading (file or built-in)
/// - the task registry and run context
/// - the selected pipeline
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let (config_path, allow_builtin) = match &args.config {
        Some(path) => (path.clone(), false),
        None => (default_config_path(), true),
    };
    let mut cfg = load_or_builtin(&config_path, allow_builtin)?;
    if let Some(port) = args.port {
        cfg.server.port = port;
    }

    let root = project_root(&config_path)?;
    let ctx = RunContext::new(root, Arc::new(RealFileSystem), cfg)?;

    let target = args.target();
    ctx.registry().ensure(target)?;

    if args.dry_run {
        print_dry_run(&ctx, target);
        return Ok(());
    }

    run_until_interrupted(&ctx, target).await
}

/// Run `target` to completion, or until Ctrl-C.
pub async fn run_until_interrupted(ctx: &Arc<RunContext>, target: &str) -> Result<()> {
    info!(root = ?ctx.root(), pipeline = target, "assetdag starting");

    tokio::select! {
        result = ctx.run_named(target) => {
            let reports = result?;
            summarize(target, &reports);
            Ok(())
        }
        Ok(()) = tokio::signal::ctrl_c() => {
            info!("interrupted; shutting down");
            Ok(())
        }
    }
}

fn summarize(target: &str, reports: &[TaskReport]) {
    let files: usize = reports.iter().map(|r| r.written.len()).sum();
    let isolated: Vec<&str> = reports
        .iter()
        .filter(|r| r.isolated_failure.is_some())
        .map(|r| r.task.as_str())
        .collect();
    if !isolated.is_empty() {
        warn!(pipeline = target, tasks = ?isolated, "finished with isolated failures");
    }
    info!(pipeline = target, tasks = reports.len(), files, "pipeline complete");
}

/// Project root: the directory holding the config file, or the current
/// working directory for a bare filename or the built-in config.
fn project_root(config_path: &Path) -> Result<PathBuf> {
    let root = match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir()?,
    };
    Ok(root.canonicalize().unwrap_or(root))
}

fn print_dry_run(ctx: &RunContext, target: &str) {
    let cfg = ctx.config();
    println!("assetdag dry-run");
    println!("  root = {}", ctx.root().display());
    println!("  paths.source = {}", cfg.paths.source);
    println!("  paths.output = {}", cfg.paths.output);
    println!("  server = {}:{}", cfg.server.host, cfg.server.port);
    println!("  selected = {target}");
    println!();

    let tasks: Vec<_> = ctx.registry().tasks().collect();
    println!("tasks ({}):", tasks.len());
    for task in tasks {
        println!("  - {}: {}", task.name(), task.describe());
        if !task.after().is_empty() {
            println!("      after: {:?}", task.after());
        }
        if let Some(description) = cfg.tasks().get(task.name()).and_then(|t| t.description.as_ref()) {
            println!("      {description}");
        }
    }
    println!();

    println!("pipelines:");
    for (name, plan) in ctx.registry().pipelines() {
        println!("  - {name} = {plan}");
    }
    println!();

    println!("watch bindings ({}):", cfg.watch.binding.len());
    for binding in &cfg.watch.binding {
        println!("  - {:?} -> {}", binding.patterns, binding.run.join(" -> "));
    }
}
