// src/task/registry.rs

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::compose::Plan;
use crate::config::{ConfigFile, TaskKind};
use crate::errors::{AssetdagError, Result};
use crate::task::{CleanTask, ProcessingTask, ReloadTask, ServeTask, Task, WatchTask};

/// Name -> task and name -> pipeline, built once at startup.
#[derive(Debug, Clone, Default)]
pub struct TaskRegistry {
    tasks: BTreeMap<String, Arc<dyn Task>>,
    pipelines: BTreeMap<String, Plan>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Instantiate every `[task.*]` and `[pipeline]` entry of a validated
    /// config.
    pub fn from_config(cfg: &ConfigFile) -> Result<Self> {
        let mut registry = Self::new();

        for (name, task_cfg) in cfg.tasks() {
            let task: Arc<dyn Task> = match task_cfg.kind {
                TaskKind::Process => Arc::new(ProcessingTask::from_config(name, task_cfg)?),
                TaskKind::Clean => Arc::new(CleanTask::new(
                    name,
                    task_cfg.dir.clone().unwrap_or_else(|| cfg.paths.output.clone()),
                    task_cfg.after.clone(),
                )),
                TaskKind::Serve => Arc::new(ServeTask::new(name, task_cfg.after.clone())),
                TaskKind::Reload => Arc::new(ReloadTask::new(name, task_cfg.after.clone())),
                TaskKind::Watch => Arc::new(WatchTask::new(name, task_cfg.after.clone())),
            };
            registry.register(task);
        }

        for (name, plan) in cfg.pipelines() {
            registry.define_pipeline(name.clone(), Plan::from(plan));
        }

        Ok(registry)
    }

    /// Add or replace a task under its own name.
    pub fn register(&mut self, task: Arc<dyn Task>) {
        self.tasks.insert(task.name().to_string(), task);
    }

    pub fn define_pipeline(&mut self, name: impl Into<String>, plan: Plan) {
        self.pipelines.insert(name.into(), plan);
    }

    pub fn task(&self, name: &str) -> Option<&Arc<dyn Task>> {
        self.tasks.get(name)
    }

    pub fn pipeline(&self, name: &str) -> Option<&Plan> {
        self.pipelines.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tasks.contains_key(name) || self.pipelines.contains_key(name)
    }

    /// Fail with `TaskNotFound` unless `name` is a task or pipeline.
    pub fn ensure(&self, name: &str) -> Result<()> {
        if self.contains(name) {
            Ok(())
        } else {
            Err(AssetdagError::TaskNotFound(name.to_string()))
        }
    }

    pub fn tasks(&self) -> impl Iterator<Item = &Arc<dyn Task>> {
        self.tasks.values()
    }

    pub fn pipelines(&self) -> impl Iterator<Item = (&str, &Plan)> {
        self.pipelines.iter().map(|(k, v)| (k.as_str(), v))
    }
}
