// src/server/mod.rs

//! Development server.
//!
//! Serves the output directory over HTTP with permissive CORS and pushes
//! reload signals to browsers through a long-poll endpoint. There is no UI
//! panel or notification overlay; the injected client only reloads pages or
//! swaps stylesheets.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use tokio::net::TcpListener;
use tokio::task::AbortHandle;
use tracing::{error, info};

use crate::config::ServerSection;
use crate::errors::{AssetdagError, Result};

pub mod reload;
pub mod routes;

pub use reload::{ReloadKind, ReloadSignal, Reloader};
pub use routes::{create_router, AppState, CLIENT_PATH, POLL_PATH};

/// A running dev server.
///
/// Created once by the `serve` task and kept in the run context for the rest
/// of the process. Dropping it stops the server.
#[derive(Debug)]
pub struct ServerSession {
    addr: SocketAddr,
    root: PathBuf,
    reloader: Reloader,
    server: AbortHandle,
}

impl ServerSession {
    /// Bind `host:port` and start serving `root` in the background.
    pub async fn start(root: impl Into<PathBuf>, cfg: &ServerSection) -> Result<Self> {
        let root = root.into();
        let bind = format!("{}:{}", cfg.host, cfg.port);
        let listener = TcpListener::bind(&bind)
            .await
            .map_err(|e| AssetdagError::Server(format!("binding {bind}: {e}")))?;
        let addr = listener
            .local_addr()
            .map_err(|e| AssetdagError::Server(format!("reading bound address: {e}")))?;

        let reloader = Reloader::new();
        let mut state = AppState::new(root.clone(), reloader.clone());
        state.inject_client = cfg.inject_client;
        let app = create_router(state, cfg.cors);

        let server = tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, app).await {
                error!(error = %err, "dev server stopped");
            }
        });

        info!(%addr, root = ?root, "dev server started");

        Ok(Self {
            addr,
            root,
            reloader,
            server: server.abort_handle(),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn reloader(&self) -> Reloader {
        self.reloader.clone()
    }
}

impl Drop for ServerSession {
    fn drop(&mut self) {
        self.server.abort();
    }
}
