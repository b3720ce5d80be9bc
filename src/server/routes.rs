// src/server/routes.rs

use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use axum::body::Body;
use axum::extract::{Query, Request, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower::ServiceExt;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};

use crate::server::reload::{ReloadSignal, Reloader};

pub const POLL_PATH: &str = "/__assetdag/poll";
pub const CLIENT_PATH: &str = "/__assetdag/client.js";

const CLIENT_JS: &str = include_str!("client.js");
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct AppState {
    pub root: PathBuf,
    pub reloader: Reloader,
    pub inject_client: bool,
    pub poll_timeout: Duration,
}

impl AppState {
    pub fn new(root: impl Into<PathBuf>, reloader: Reloader) -> Self {
        Self {
            root: root.into(),
            reloader,
            inject_client: true,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
        }
    }
}

pub fn create_router(state: AppState, cors: bool) -> Router {
    let router = Router::new()
        .route(POLL_PATH, get(poll))
        .route(CLIENT_PATH, get(client_js))
        .fallback(serve_static)
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if cors {
        router.layer(CorsLayer::permissive())
    } else {
        router
    }
}

#[derive(Debug, Deserialize)]
pub struct PollQuery {
    since: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct PollResponse {
    pub seq: u64,
    pub signals: Vec<ReloadSignal>,
}

/// Long-poll for reload signals.
///
/// Without `since` the current sequence number is returned immediately so a
/// fresh client knows where to start.
async fn poll(State(state): State<AppState>, Query(query): Query<PollQuery>) -> Response {
    let Some(since) = query.since else {
        return Json(PollResponse {
            seq: state.reloader.current_seq(),
            signals: Vec::new(),
        })
        .into_response();
    };

    let signals = state.reloader.wait_since(since, state.poll_timeout).await;
    if signals.is_empty() {
        return StatusCode::NO_CONTENT.into_response();
    }
    let seq = signals.last().map_or(since, |s| s.seq);
    Json(PollResponse { seq, signals }).into_response()
}

async fn client_js() -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "application/javascript; charset=utf-8"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        CLIENT_JS,
    )
}

/// Map a request path to a file under `root`, refusing anything that would
/// leave it.
fn local_path(root: &Path, uri_path: &str) -> Option<PathBuf> {
    let mut out = root.to_path_buf();
    for component in Path::new(uri_path.trim_start_matches('/')).components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    Some(out)
}

fn is_html(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("html") || e.eq_ignore_ascii_case("htm"))
}

/// Insert the reload client before `</body>`, or append it.
pub fn inject_client(html: &str) -> String {
    let tag = format!("<script src=\"{CLIENT_PATH}\" defer></script>");
    match html.rfind("</body>") {
        Some(at) => format!("{}{}{}", &html[..at], tag, &html[at..]),
        None => format!("{html}{tag}"),
    }
}

async fn serve_static(State(state): State<AppState>, req: Request) -> Response {
    if state.inject_client {
        if let Some(response) = serve_html(&state, req.uri().path()).await {
            return response;
        }
    }

    match ServeDir::new(&state.root).oneshot(req).await {
        Ok(response) => response.map(Body::new),
        Err(never) => match never {},
    }
}

/// HTML documents (including directory indexes) are read and served with
/// the reload client injected. Anything else falls through to `ServeDir`.
async fn serve_html(state: &AppState, uri_path: &str) -> Option<Response> {
    let mut path = local_path(&state.root, uri_path)?;
    if tokio::fs::metadata(&path).await.ok()?.is_dir() {
        path.push("index.html");
    }
    if !is_html(&path) {
        return None;
    }

    match tokio::fs::read_to_string(&path).await {
        Ok(body) => {
            debug!(path = ?path, "serving html with reload client");
            Some(Html(inject_client(&body)).into_response())
        }
        Err(err) => {
            warn!(path = ?path, error = %err, "could not read html; falling back to static serving");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn injects_before_body_close() {
        let html = "<html><body><p>x</p></body></html>";
        assert_eq!(
            inject_client(html),
            format!("<html><body><p>x</p><script src=\"{CLIENT_PATH}\" defer></script></body></html>")
        );
    }

    #[test]
    fn appends_when_no_body() {
        assert!(inject_client("<p>x</p>").ends_with("defer></script>"));
    }

    #[test]
    fn local_path_rejects_traversal() {
        let root = Path::new("/srv/build");
        assert_eq!(
            local_path(root, "/css/a.css"),
            Some(PathBuf::from("/srv/build/css/a.css"))
        );
        assert_eq!(local_path(root, "/"), Some(PathBuf::from("/srv/build")));
        assert_eq!(local_path(root, "/../etc/passwd"), None);
    }
}
