// src/server/reload.rs

//! Reload broadcaster.
//!
//! Signals carry a monotonically increasing sequence number. A short history
//! is kept so a client that polls with `since = N` receives every signal
//! newer than `N`, not just the latest one. Waiters are woken through a
//! `tokio::sync::watch` channel carrying the current sequence number.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info};

const HISTORY_LEN: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ReloadKind {
    /// Navigate-in-place reload of the whole page.
    Full,
    /// Swap the stylesheet served at `path` without reloading.
    Inject { path: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReloadSignal {
    pub seq: u64,
    #[serde(flatten)]
    pub kind: ReloadKind,
}

#[derive(Debug)]
struct Inner {
    seq_tx: watch::Sender<u64>,
    history: Mutex<VecDeque<ReloadSignal>>,
}

/// Cheap clonable handle used by tasks to notify browsers.
#[derive(Debug, Clone)]
pub struct Reloader {
    inner: Arc<Inner>,
}

impl Default for Reloader {
    fn default() -> Self {
        Self::new()
    }
}

impl Reloader {
    pub fn new() -> Self {
        let (seq_tx, _) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                seq_tx,
                history: Mutex::new(VecDeque::with_capacity(HISTORY_LEN)),
            }),
        }
    }

    fn history(&self) -> MutexGuard<'_, VecDeque<ReloadSignal>> {
        self.inner
            .history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Broadcast `kind` to every connected client.
    pub fn send(&self, kind: ReloadKind) {
        let seq = {
            let mut history = self.history();
            let seq = history.back().map_or(0, |s| s.seq) + 1;
            history.push_back(ReloadSignal {
                seq,
                kind: kind.clone(),
            });
            while history.len() > HISTORY_LEN {
                history.pop_front();
            }
            seq
        };
        self.inner.seq_tx.send_replace(seq);
        info!(seq, ?kind, clients = self.clients(), "reload broadcast");
    }

    /// Sequence number of the latest signal (0 before the first).
    pub fn current_seq(&self) -> u64 {
        *self.inner.seq_tx.borrow()
    }

    /// Number of clients currently waiting on a poll.
    pub fn clients(&self) -> usize {
        self.inner.seq_tx.receiver_count()
    }

    /// Signals newer than `since`.
    ///
    /// A client that fell behind the retained history gets a single full
    /// reload carrying the latest sequence number.
    pub fn since(&self, since: u64) -> Vec<ReloadSignal> {
        let history = self.history();
        let Some(oldest) = history.front() else {
            return Vec::new();
        };
        if since.saturating_add(1) < oldest.seq {
            let latest = history.back().map_or(oldest.seq, |s| s.seq);
            debug!(since, latest, "client behind reload history; forcing full reload");
            return vec![ReloadSignal {
                seq: latest,
                kind: ReloadKind::Full,
            }];
        }
        history.iter().filter(|s| s.seq > since).cloned().collect()
    }

    /// Wait up to `timeout` for a signal newer than `since`.
    ///
    /// Returns an empty list on timeout.
    pub async fn wait_since(&self, since: u64, timeout: Duration) -> Vec<ReloadSignal> {
        let mut rx = self.inner.seq_tx.subscribe();
        let _ = tokio::time::timeout(timeout, rx.wait_for(|seq| *seq > since)).await;
        self.since(since)
    }
}
