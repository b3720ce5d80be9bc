// src/task/context.rs

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use tracing::debug;

use crate::compose::Plan;
use crate::config::ConfigFile;
use crate::errors::{AssetdagError, Result};
use crate::fs::FileSystem;
use crate::server::{Reloader, ServerSession};
use crate::task::{TaskRegistry, TaskReport};

/// Everything a task invocation may touch.
///
/// One context is created per process and shared behind an `Arc`. The dev
/// server session is stored here by the `serve` task; `reload` and `watch`
/// read it back.
#[derive(Debug)]
pub struct RunContext {
    root: PathBuf,
    fs: Arc<dyn FileSystem>,
    config: Arc<ConfigFile>,
    registry: TaskRegistry,
    session: OnceLock<ServerSession>,
}

impl RunContext {
    /// Build the registry from `config` and wrap everything up.
    pub fn new(root: impl Into<PathBuf>, fs: Arc<dyn FileSystem>, config: ConfigFile) -> Result<Arc<Self>> {
        let registry = TaskRegistry::from_config(&config)?;
        Ok(Self::with_registry(root, fs, config, registry))
    }

    pub fn with_registry(
        root: impl Into<PathBuf>,
        fs: Arc<dyn FileSystem>,
        config: ConfigFile,
        registry: TaskRegistry,
    ) -> Arc<Self> {
        Arc::new(Self {
            root: root.into(),
            fs,
            config: Arc::new(config),
            registry,
            session: OnceLock::new(),
        })
    }

    /// Project root; every pattern and directory is relative to it.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn fs(&self) -> &Arc<dyn FileSystem> {
        &self.fs
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    pub fn output_dir(&self) -> PathBuf {
        self.root.join(&self.config.paths.output)
    }

    /// Directory the dev server serves.
    pub fn server_root(&self) -> PathBuf {
        self.root.join(self.config.server_root())
    }

    pub fn session(&self) -> Option<&ServerSession> {
        self.session.get()
    }

    /// Reload handle of the running dev server, if any.
    pub fn reloader(&self) -> Option<Reloader> {
        self.session().map(ServerSession::reloader)
    }

    pub(crate) fn install_session(&self, session: ServerSession) -> Result<&ServerSession> {
        self.session.set(session).map_err(|rejected| {
            AssetdagError::Server(format!(
                "dev server already running; refusing second listener on {}",
                rejected.addr()
            ))
        })?;
        debug!("dev server session installed");
        self.session
            .get()
            .ok_or_else(|| AssetdagError::Server("session vanished after install".into()))
    }

    /// Run the task or pipeline called `name`.
    pub async fn run_named(self: &Arc<Self>, name: &str) -> Result<Vec<TaskReport>> {
        Plan::task(name).run(self).await
    }
}
