// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::types::{ErrorPolicy, ReloadMode, WhileRunning};

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [paths]
/// source = "source"
/// output = "build"
///
/// [task.html]
/// src = ["source/*.html"]
/// dest = "build"
/// stages = [{ kind = "html" }]
///
/// [pipeline]
/// build = { series = ["clean", { parallel = ["html", "scripts"] }] }
///
/// [[watch.binding]]
/// patterns = ["source/*.html"]
/// run = ["html", "reload"]
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub paths: PathsSection,

    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub watch: WatchSection,

    /// All tasks from `[task.<name>]`.
    #[serde(default)]
    pub task: BTreeMap<String, TaskConfig>,

    /// Named compositions from `[pipeline]`.
    #[serde(default)]
    pub pipeline: BTreeMap<String, PlanConfig>,
}

/// Validated configuration.
///
/// Only obtainable through `ConfigFile::try_from(RawConfigFile)`, so holders
/// can assume every reference resolves and the task graph is acyclic.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub paths: PathsSection,
    pub server: ServerSection,
    pub watch: WatchSection,
    pub task: BTreeMap<String, TaskConfig>,
    pub pipeline: BTreeMap<String, PlanConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            paths: raw.paths,
            server: raw.server,
            watch: raw.watch,
            task: raw.task,
            pipeline: raw.pipeline,
        }
    }

    pub fn tasks(&self) -> &BTreeMap<String, TaskConfig> {
        &self.task
    }

    pub fn pipelines(&self) -> &BTreeMap<String, PlanConfig> {
        &self.pipeline
    }

    /// Directory served by the dev server, relative to the project root.
    pub fn server_root(&self) -> &str {
        self.server.root.as_deref().unwrap_or(&self.paths.output)
    }
}

/// `[paths]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct PathsSection {
    #[serde(default = "default_source_dir")]
    pub source: String,

    /// Output tree. Watch events under it are ignored.
    #[serde(default = "default_output_dir")]
    pub output: String,
}

fn default_source_dir() -> String {
    "source".to_string()
}

fn default_output_dir() -> String {
    "build".to_string()
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            source: default_source_dir(),
            output: default_output_dir(),
        }
    }
}

/// `[server]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Allow cross-origin requests.
    #[serde(default = "default_true")]
    pub cors: bool,

    /// Served directory; falls back to `paths.output`.
    #[serde(default)]
    pub root: Option<String>,

    /// Inject the reload client script into served HTML pages.
    #[serde(default = "default_true")]
    pub inject_client: bool,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_true() -> bool {
    true
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors: true,
            root: None,
            inject_client: true,
        }
    }
}

/// `[watch]` section plus its `[[watch.binding]]` entries.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchSection {
    /// Quiet period after the last relevant filesystem event before the
    /// bound tasks run.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    #[serde(default)]
    pub while_running: WhileRunning,

    /// Maximum number of queued re-runs per binding (`while_running = "queue"`).
    #[serde(default = "default_queue_length")]
    pub queue_length: usize,

    #[serde(default)]
    pub binding: Vec<WatchBindingConfig>,
}

fn default_debounce_ms() -> u64 {
    200
}

fn default_queue_length() -> usize {
    1
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            while_running: WhileRunning::default(),
            queue_length: default_queue_length(),
            binding: Vec::new(),
        }
    }
}

/// `[[watch.binding]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchBindingConfig {
    /// Globs relative to the project root; `!` prefix excludes.
    pub patterns: Vec<String>,

    /// Task or pipeline names run in sequence on every matching change.
    pub run: Vec<String>,
}

/// Kind of a `[task.<name>]` entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    Process,
    Clean,
    Serve,
    Reload,
    Watch,
}

impl Default for TaskKind {
    fn default() -> Self {
        TaskKind::Process
    }
}

/// `[task.<name>]` section.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TaskConfig {
    #[serde(default)]
    pub kind: TaskKind,

    #[serde(default)]
    pub description: Option<String>,

    /// Tasks that must complete, in order, before this one runs.
    #[serde(default)]
    pub after: Vec<String>,

    /// Input globs (process tasks). Later `!` entries exclude.
    #[serde(default)]
    pub src: Vec<String>,

    /// Base directory for output-relative paths. Defaults to the glob parent
    /// of whichever `src` pattern matched a file.
    #[serde(default)]
    pub base: Option<String>,

    /// Destination directory (process tasks).
    #[serde(default)]
    pub dest: Option<String>,

    #[serde(default)]
    pub stages: Vec<StageConfig>,

    #[serde(default)]
    pub on_error: ErrorPolicy,

    #[serde(default)]
    pub reload: ReloadMode,

    /// Emit `<file>.map` next to outputs carrying a source map.
    #[serde(default)]
    pub sourcemaps: bool,

    /// Directory removed by a `clean` task; defaults to `paths.output`.
    #[serde(default)]
    pub dir: Option<String>,
}

/// One entry of a task's `stages = [...]` list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StageConfig {
    /// Bundle `@import`s, lower for `targets`, minify.
    Css {
        #[serde(default)]
        targets: Vec<String>,
    },
    Rename {
        to: String,
    },
    Html,
    Js,
    /// Re-encode PNG/JPEG.
    Optimize {
        #[serde(default)]
        quality: Option<u8>,
    },
    Webp,
    Svgo,
    Sprite {
        #[serde(default)]
        file: Option<String>,
    },
    /// Pipe each file through an external shell command.
    Command {
        cmd: String,
    },
}

/// A composition as written in `[pipeline]` or referenced by name.
///
/// ```toml
/// [pipeline]
/// images = { parallel = ["optimize-images", "webp"] }
/// build = { series = ["clean", "images"] }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum PlanConfig {
    Name(String),
    Series { series: Vec<PlanConfig> },
    Parallel { parallel: Vec<PlanConfig> },
}

impl PlanConfig {
    /// Every task/pipeline name referenced anywhere inside this plan.
    pub fn referenced_names(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_names(&mut out);
        out
    }

    fn collect_names<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            PlanConfig::Name(name) => out.push(name.as_str()),
            PlanConfig::Series { series } => series.iter().for_each(|p| p.collect_names(out)),
            PlanConfig::Parallel { parallel } => {
                parallel.iter().for_each(|p| p.collect_names(out))
            }
        }
    }
}
