// src/watch/mod.rs

//! File watching and rebuild scheduling.
//!
//! - [`watcher`]: `notify` glue forwarding changed paths into Tokio.
//! - [`core`]: pure per-binding state (dirty / running / queued).
//! - [`scheduler`]: the async loop that debounces events and runs bindings.
//!
//! Watching starts once, after the serve phase of the default pipeline, and
//! lasts for the rest of the process.

pub mod cache;
pub mod core;
pub mod path_utils;
pub mod scheduler;
pub mod watcher;

pub use cache::ContentCache;
pub use core::{Binding, BindingId, WatchCore};
pub use path_utils::relative_str;
pub use scheduler::{WatchScheduler, WatchState};
pub use watcher::{spawn_watcher, WatcherHandle};
