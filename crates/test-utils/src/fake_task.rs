use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use assetdag::errors::{AssetdagError, Result};
use assetdag::task::{BoxFuture, RunContext, Task, TaskReport};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskEvent {
    Started(String),
    Finished(String),
    Failed(String),
}

/// Shared, ordered log of task events.
#[derive(Debug, Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<TaskEvent>>>);

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, event: TaskEvent) {
        self.0.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<TaskEvent> {
        self.0.lock().unwrap().clone()
    }

    pub fn position(&self, event: &TaskEvent) -> Option<usize> {
        self.events().iter().position(|e| e == event)
    }

    pub fn started(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                TaskEvent::Started(name) => Some(name),
                _ => None,
            })
            .collect()
    }
}

/// A fake task that:
/// - records start/finish into an [`EventLog`]
/// - optionally sleeps, writes a file (relative to the project root), or fails.
#[derive(Debug, Clone)]
pub struct RecordingTask {
    name: String,
    after: Vec<String>,
    delay: Duration,
    writes: Option<(PathBuf, Vec<u8>)>,
    fail: bool,
    log: EventLog,
}

impl RecordingTask {
    pub fn new(name: &str, log: &EventLog) -> Self {
        Self {
            name: name.to_string(),
            after: Vec::new(),
            delay: Duration::ZERO,
            writes: None,
            fail: false,
            log: log.clone(),
        }
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn writes(mut self, rel: &str, contents: &str) -> Self {
        self.writes = Some((PathBuf::from(rel), contents.as_bytes().to_vec()));
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.after.push(dep.to_string());
        self
    }

    pub fn arc(self) -> Arc<dyn Task> {
        Arc::new(self)
    }
}

impl Task for RecordingTask {
    fn name(&self) -> &str {
        &self.name
    }

    fn after(&self) -> &[String] {
        &self.after
    }

    fn describe(&self) -> String {
        "recording fake".to_string()
    }

    fn run<'a>(&'a self, ctx: &'a Arc<RunContext>) -> BoxFuture<'a, Result<TaskReport>> {
        Box::pin(async move {
            self.log.push(TaskEvent::Started(self.name.clone()));
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }

            if self.fail {
                self.log.push(TaskEvent::Failed(self.name.clone()));
                return Err(AssetdagError::Stage {
                    task: self.name.clone(),
                    stage: "fake".to_string(),
                    message: "configured to fail".to_string(),
                });
            }

            let mut report = TaskReport::new(&self.name);
            if let Some((rel, contents)) = &self.writes {
                let path = ctx.root().join(rel);
                ctx.fs().write(&path, contents)?;
                report.written.push(path);
            }

            self.log.push(TaskEvent::Finished(self.name.clone()));
            Ok(report)
        })
    }
}
