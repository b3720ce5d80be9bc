// src/types.rs

use serde::Deserialize;

/// What a processing task does when one of its stages fails.
///
/// - `Abort`: the failure propagates and fails the enclosing pipeline.
/// - `Isolate`: the failure is logged and swallowed; the task reports
///   success with nothing written, so a long-running watch loop survives a
///   bad edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    Abort,
    Isolate,
}

impl Default for ErrorPolicy {
    fn default() -> Self {
        ErrorPolicy::Abort
    }
}

/// How a processing task notifies connected browsers once its output is
/// written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReloadMode {
    /// No notification.
    None,
    /// Push each written stylesheet to clients for in-place injection.
    Inject,
    /// Ask clients for a full page reload.
    Full,
}

impl Default for ReloadMode {
    fn default() -> Self {
        ReloadMode::None
    }
}

/// Behaviour when a watch binding fires again while its previous run is
/// still in flight.
///
/// - `Queue`: remember the trigger (up to `queue_length` times, coalesced)
///   and start another run once the current one finishes.
/// - `Overlap`: start another run immediately; the runs race and the last
///   writer wins on shared output files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WhileRunning {
    Queue,
    Overlap,
}

impl Default for WhileRunning {
    fn default() -> Self {
        WhileRunning::Queue
    }
}
