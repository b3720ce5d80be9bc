// src/watch/scheduler.rs

//! Async shell around [`WatchCore`].

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::compose::Plan;
use crate::errors::Result;
use crate::task::RunContext;
use crate::watch::cache::ContentCache;
use crate::watch::core::{Binding, BindingId, WatchCore};
use crate::watch::path_utils::relative_str;
use crate::watch::watcher::spawn_watcher;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    /// Bindings compiled, nothing observed yet.
    Idle,
    /// Bindings active; runs until the event source closes or the process
    /// is stopped.
    Watching,
}

#[derive(Debug)]
pub struct WatchScheduler {
    ctx: Arc<RunContext>,
    core: WatchCore,
    cache: ContentCache,
    debounce: Duration,
    state: WatchState,
}

impl WatchScheduler {
    /// Compile the `[[watch.binding]]` tables of the context's config.
    pub fn new(ctx: Arc<RunContext>) -> Result<Self> {
        let watch = &ctx.config().watch;
        let bindings = watch
            .binding
            .iter()
            .map(Binding::from_config)
            .collect::<Result<Vec<_>>>()?;

        let core = WatchCore::new(
            bindings,
            watch.while_running,
            watch.queue_length,
            ctx.config().paths.output.clone(),
        );
        let debounce = Duration::from_millis(watch.debounce_ms);

        Ok(Self {
            ctx,
            core,
            cache: ContentCache::new(),
            debounce,
            state: WatchState::Idle,
        })
    }

    pub fn state(&self) -> WatchState {
        self.state
    }

    /// Watch the project root until the process is stopped.
    pub async fn run(self) -> Result<()> {
        let (handle, events) = spawn_watcher(self.ctx.root())?;
        debug!(root = ?handle.root(), "watch scheduler attached");
        let result = self.run_with_events(events).await;
        drop(handle);
        result
    }

    /// Drive the scheduler from an arbitrary stream of changed paths.
    ///
    /// Returns once `events` is closed and every pending and in-flight run
    /// has finished.
    pub async fn run_with_events(
        mut self,
        mut events: mpsc::UnboundedReceiver<PathBuf>,
    ) -> Result<()> {
        self.state = WatchState::Watching;
        info!(
            bindings = self.core.bindings().len(),
            debounce_ms = self.debounce.as_millis() as u64,
            "watching for changes"
        );

        let (done_tx, mut done_rx) = mpsc::unbounded_channel::<BindingId>();
        let mut deadline: Option<Instant> = None;
        let mut open = true;

        loop {
            if !open && deadline.is_none() && self.core.is_idle() {
                break;
            }

            let sleep_until = deadline.unwrap_or_else(Instant::now);

            tokio::select! {
                maybe = events.recv(), if open => match maybe {
                    Some(path) => {
                        if self.observe(&path) {
                            deadline = Some(Instant::now() + self.debounce);
                        }
                    }
                    None => {
                        debug!("watch event source closed");
                        open = false;
                        if self.core.has_dirty() && deadline.is_none() {
                            deadline = Some(Instant::now());
                        }
                    }
                },
                _ = tokio::time::sleep_until(sleep_until), if deadline.is_some() => {
                    deadline = None;
                    for id in self.core.flush() {
                        self.start_run(id, &done_tx);
                    }
                },
                Some(id) = done_rx.recv() => {
                    for id in self.core.run_finished(id) {
                        self.start_run(id, &done_tx);
                    }
                },
            }
        }

        info!("watch scheduler stopped");
        Ok(())
    }

    /// Feed one changed path into the core; true if a binding became dirty.
    fn observe(&mut self, path: &Path) -> bool {
        let Some(rel) = relative_str(self.ctx.root(), path) else {
            warn!(path = ?path, root = ?self.ctx.root(), "event outside project root");
            return false;
        };
        if !self.core.bindings().iter().any(|b| b.patterns.matches(&rel)) {
            return false;
        }
        if !self.cache.observe(self.ctx.fs().as_ref(), path) {
            return false;
        }
        self.core.path_changed(&rel)
    }

    fn start_run(&self, id: BindingId, done_tx: &mpsc::UnboundedSender<BindingId>) {
        let binding = self.core.binding(id);
        let label = binding.label();
        let plan = Plan::series(binding.run.iter().map(Plan::task));
        let ctx = Arc::clone(&self.ctx);
        let done_tx = done_tx.clone();

        info!(binding = %label, "change detected; re-running");
        tokio::spawn(async move {
            match plan.run(&ctx).await {
                Ok(reports) => {
                    let files: usize = reports.iter().map(|r| r.written.len()).sum();
                    info!(binding = %label, files, "re-run finished");
                }
                Err(err) => {
                    error!(binding = %label, error = %err, "re-run failed; still watching")
                }
            }
            let _ = done_tx.send(id);
        });
    }
}
