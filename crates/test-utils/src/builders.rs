#![allow(dead_code)]

use assetdag::config::{
    ConfigFile, PlanConfig, RawConfigFile, StageConfig, TaskConfig, TaskKind, WatchBindingConfig,
};
use assetdag::errors::Result;
use assetdag::types::{ErrorPolicy, ReloadMode, WhileRunning};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn with_task(mut self, name: &str, task: TaskConfig) -> Self {
        self.config.task.insert(name.to_string(), task);
        self
    }

    pub fn with_pipeline(mut self, name: &str, plan: PlanConfig) -> Self {
        self.config.pipeline.insert(name.to_string(), plan);
        self
    }

    pub fn with_binding(mut self, patterns: &[&str], run: &[&str]) -> Self {
        self.config.watch.binding.push(WatchBindingConfig {
            patterns: patterns.iter().map(|s| s.to_string()).collect(),
            run: run.iter().map(|s| s.to_string()).collect(),
        });
        self
    }

    pub fn output(mut self, dir: &str) -> Self {
        self.config.paths.output = dir.to_string();
        self
    }

    pub fn debounce_ms(mut self, ms: u64) -> Self {
        self.config.watch.debounce_ms = ms;
        self
    }

    pub fn while_running(mut self, mode: WhileRunning) -> Self {
        self.config.watch.while_running = mode;
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.server.port = port;
        self
    }

    pub fn try_build(self) -> Result<ConfigFile> {
        ConfigFile::try_from(self.config)
    }

    pub fn build(self) -> ConfigFile {
        self.try_build()
            .expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Plan shorthand: `series(&["a", "b"])`.
pub fn series(names: &[&str]) -> PlanConfig {
    PlanConfig::Series {
        series: names.iter().map(|n| PlanConfig::Name(n.to_string())).collect(),
    }
}

pub fn parallel(names: &[&str]) -> PlanConfig {
    PlanConfig::Parallel {
        parallel: names.iter().map(|n| PlanConfig::Name(n.to_string())).collect(),
    }
}

/// Builder for `TaskConfig`.
pub struct TaskConfigBuilder {
    task: TaskConfig,
}

impl TaskConfigBuilder {
    /// A processing task reading `src` into `dest`.
    pub fn process(src: &[&str], dest: &str) -> Self {
        Self {
            task: TaskConfig {
                src: src.iter().map(|s| s.to_string()).collect(),
                dest: Some(dest.to_string()),
                ..TaskConfig::default()
            },
        }
    }

    pub fn kind(kind: TaskKind) -> Self {
        Self {
            task: TaskConfig {
                kind,
                ..TaskConfig::default()
            },
        }
    }

    pub fn stage(mut self, stage: StageConfig) -> Self {
        self.task.stages.push(stage);
        self
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.task.after.push(dep.to_string());
        self
    }

    pub fn base(mut self, base: &str) -> Self {
        self.task.base = Some(base.to_string());
        self
    }

    pub fn on_error(mut self, policy: ErrorPolicy) -> Self {
        self.task.on_error = policy;
        self
    }

    pub fn reload(mut self, mode: ReloadMode) -> Self {
        self.task.reload = mode;
        self
    }

    pub fn sourcemaps(mut self) -> Self {
        self.task.sourcemaps = true;
        self
    }

    pub fn build(self) -> TaskConfig {
        self.task
    }
}
