// src/watch/core.rs

//! Pure watch state machine.
//!
//! [`WatchCore`] consumes three kinds of input and answers with the binding
//! runs the IO shell should start:
//!
//! - a changed path (marks matching bindings dirty),
//! - a debounce flush (turns dirty bindings into runs or queued re-runs),
//! - a finished run (starts a queued re-run, if any).
//!
//! It owns no channels, timers or Tokio types so it can be unit tested
//! directly.

use tracing::{debug, trace};

use crate::config::WatchBindingConfig;
use crate::errors::Result;
use crate::fileset::FilePattern;
use crate::types::WhileRunning;
use crate::watch::path_utils::is_within;

pub type BindingId = usize;

/// A compiled `[[watch.binding]]`.
#[derive(Debug, Clone)]
pub struct Binding {
    pub patterns: FilePattern,
    /// Task or pipeline names, run in sequence.
    pub run: Vec<String>,
}

impl Binding {
    pub fn from_config(cfg: &WatchBindingConfig) -> Result<Self> {
        Ok(Self {
            patterns: FilePattern::new(&cfg.patterns)?,
            run: cfg.run.clone(),
        })
    }

    pub fn label(&self) -> String {
        self.run.join(" -> ")
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct BindingState {
    dirty: bool,
    running: usize,
    queued: usize,
}

#[derive(Debug)]
pub struct WatchCore {
    bindings: Vec<Binding>,
    states: Vec<BindingState>,
    while_running: WhileRunning,
    queue_length: usize,
    /// Changes below this root-relative directory never trigger.
    ignored_dir: String,
}

impl WatchCore {
    pub fn new(
        bindings: Vec<Binding>,
        while_running: WhileRunning,
        queue_length: usize,
        ignored_dir: impl Into<String>,
    ) -> Self {
        let states = vec![BindingState::default(); bindings.len()];
        Self {
            bindings,
            states,
            while_running,
            queue_length: queue_length.max(1),
            ignored_dir: ignored_dir.into(),
        }
    }

    pub fn binding(&self, id: BindingId) -> &Binding {
        &self.bindings[id]
    }

    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    /// Record a change to `rel_path` (root-relative, forward slashes).
    ///
    /// Returns `true` if at least one binding became dirty, i.e. the shell
    /// should (re)arm its debounce timer.
    pub fn path_changed(&mut self, rel_path: &str) -> bool {
        if is_within(rel_path, &self.ignored_dir) {
            trace!(path = rel_path, "change inside output directory ignored");
            return false;
        }

        let mut any = false;
        for (id, binding) in self.bindings.iter().enumerate() {
            if binding.patterns.matches(rel_path) {
                debug!(path = rel_path, binding = %binding.label(), "binding matched");
                self.states[id].dirty = true;
                any = true;
            }
        }
        any
    }

    /// Debounce window elapsed: start or queue every dirty binding.
    pub fn flush(&mut self) -> Vec<BindingId> {
        let mut start = Vec::new();
        for (id, state) in self.states.iter_mut().enumerate() {
            if !state.dirty {
                continue;
            }
            state.dirty = false;

            if state.running == 0 || self.while_running == WhileRunning::Overlap {
                state.running += 1;
                start.push(id);
            } else if state.queued < self.queue_length {
                state.queued += 1;
                debug!(binding = id, queued = state.queued, "binding busy; re-run queued");
            } else {
                debug!(binding = id, "binding busy and queue full; change coalesced");
            }
        }
        start
    }

    /// A run of `id` completed (successfully or not).
    pub fn run_finished(&mut self, id: BindingId) -> Vec<BindingId> {
        let Some(state) = self.states.get_mut(id) else {
            return Vec::new();
        };
        state.running = state.running.saturating_sub(1);

        if state.running == 0 && state.queued > 0 {
            state.queued -= 1;
            state.running += 1;
            return vec![id];
        }
        Vec::new()
    }

    pub fn has_dirty(&self) -> bool {
        self.states.iter().any(|s| s.dirty)
    }

    /// Nothing dirty, running or queued.
    pub fn is_idle(&self) -> bool {
        self.states
            .iter()
            .all(|s| !s.dirty && s.running == 0 && s.queued == 0)
    }
}
