mod common;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use assetdag::config::{ConfigFile, StageConfig, TaskKind};
use assetdag::fs::RealFileSystem;
use assetdag::task::{RunContext, TaskRegistry};
use assetdag::types::{ErrorPolicy, WhileRunning};
use assetdag::watch::{WatchScheduler, WatchState};
use assetdag_test_utils::builders::{ConfigFileBuilder, TaskConfigBuilder};
use assetdag_test_utils::fake_task::{EventLog, RecordingTask, TaskEvent};
use tempfile::tempdir;
use tokio::sync::mpsc;

use common::{context_from, init_tracing, with_timeout, write_file};

/// Bindings over `styles` and `html`; the tasks themselves are swapped for
/// recording fakes.
fn fake_config(mode: WhileRunning) -> ConfigFile {
    ConfigFileBuilder::new()
        .debounce_ms(20)
        .while_running(mode)
        .with_task("styles", TaskConfigBuilder::kind(TaskKind::Clean).build())
        .with_task("html", TaskConfigBuilder::kind(TaskKind::Clean).build())
        .with_binding(&["source/css/**/*.css"], &["styles"])
        .with_binding(&["source/*.html"], &["html"])
        .build()
}

fn fake_context(root: &Path, mode: WhileRunning, log: &EventLog, delay: Duration) -> Arc<RunContext> {
    let mut registry = TaskRegistry::new();
    registry.register(RecordingTask::new("styles", log).delay(delay).arc());
    registry.register(RecordingTask::new("html", log).arc());
    RunContext::with_registry(root, Arc::new(RealFileSystem), fake_config(mode), registry)
}

#[tokio::test]
async fn burst_of_changes_runs_binding_once() {
    init_tracing();
    let dir = tempdir().unwrap();
    let log = EventLog::new();
    let ctx = fake_context(dir.path(), WhileRunning::Queue, &log, Duration::ZERO);

    let scheduler = WatchScheduler::new(ctx).unwrap();
    assert_eq!(scheduler.state(), WatchState::Idle);

    let (tx, rx) = mpsc::unbounded_channel();
    for (i, name) in ["a.css", "blocks/b.css", "c.css"].iter().enumerate() {
        let rel = format!("source/css/{name}");
        write_file(dir.path(), &rel, format!("a{{z-index:{i}}}"));
        tx.send(dir.path().join(rel)).unwrap();
    }
    drop(tx);

    with_timeout(scheduler.run_with_events(rx)).await.unwrap();
    assert_eq!(log.started(), vec!["styles".to_string()]);
}

#[tokio::test]
async fn unmatched_unchanged_and_output_paths_are_ignored() {
    init_tracing();
    let dir = tempdir().unwrap();
    let log = EventLog::new();
    let ctx = fake_context(dir.path(), WhileRunning::Queue, &log, Duration::ZERO);
    let scheduler = WatchScheduler::new(ctx).unwrap();

    write_file(dir.path(), "source/js/app.js", "1");
    write_file(dir.path(), "build/css/style.css", "a{}");

    let (tx, rx) = mpsc::unbounded_channel();
    tx.send(dir.path().join("source/js/app.js")).unwrap();
    tx.send(dir.path().join("build/css/style.css")).unwrap();
    drop(tx);

    with_timeout(scheduler.run_with_events(rx)).await.unwrap();
    assert!(log.events().is_empty());
}

#[tokio::test]
async fn change_during_run_is_queued_until_it_finishes() {
    init_tracing();
    let dir = tempdir().unwrap();
    let log = EventLog::new();
    let ctx = fake_context(dir.path(), WhileRunning::Queue, &log, Duration::from_millis(200));
    let scheduler = WatchScheduler::new(ctx).unwrap();

    let (tx, rx) = mpsc::unbounded_channel();
    let handle = tokio::spawn(scheduler.run_with_events(rx));

    let css = dir.path().join("source/css/a.css");
    write_file(dir.path(), "source/css/a.css", "a{}");
    tx.send(css.clone()).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    write_file(dir.path(), "source/css/a.css", "a{color:red}");
    tx.send(css).unwrap();
    drop(tx);

    with_timeout(handle).await.unwrap().unwrap();

    let styles_started = TaskEvent::Started("styles".into());
    let styles_finished = TaskEvent::Finished("styles".into());
    let events = log.events();
    assert_eq!(events.iter().filter(|e| **e == styles_started).count(), 2);
    // Second start strictly follows the first finish.
    let first_finish = log.position(&styles_finished).unwrap();
    let second_start = events
        .iter()
        .enumerate()
        .filter(|(_, e)| **e == styles_started)
        .nth(1)
        .map(|(i, _)| i)
        .unwrap();
    assert!(first_finish < second_start);
}

#[tokio::test]
async fn overlap_mode_starts_second_run_immediately() {
    init_tracing();
    let dir = tempdir().unwrap();
    let log = EventLog::new();
    let ctx = fake_context(dir.path(), WhileRunning::Overlap, &log, Duration::from_millis(300));
    let scheduler = WatchScheduler::new(ctx).unwrap();

    let (tx, rx) = mpsc::unbounded_channel();
    let handle = tokio::spawn(scheduler.run_with_events(rx));

    let css = dir.path().join("source/css/a.css");
    write_file(dir.path(), "source/css/a.css", "a{}");
    tx.send(css.clone()).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    write_file(dir.path(), "source/css/a.css", "a{color:red}");
    tx.send(css).unwrap();
    drop(tx);

    with_timeout(handle).await.unwrap().unwrap();

    let events = log.events();
    assert_eq!(events[0], TaskEvent::Started("styles".into()));
    assert_eq!(events[1], TaskEvent::Started("styles".into()));
}

fn isolated_styles_config() -> ConfigFile {
    ConfigFileBuilder::new()
        .debounce_ms(20)
        .with_task(
            "styles",
            TaskConfigBuilder::process(&["source/css/style.css"], "build/css")
                .stage(StageConfig::Css { targets: Vec::new() })
                .on_error(ErrorPolicy::Isolate)
                .build(),
        )
        .with_binding(&["source/css/**/*.css"], &["styles"])
        .build()
}

/// Feed `broken` then `fixed` through a running scheduler and return the
/// compiled stylesheet.
async fn edit_broken_then_fixed(broken: &str, fixed: &str) -> String {
    let dir = tempdir().unwrap();
    let ctx = context_from(dir.path(), isolated_styles_config());
    let scheduler = WatchScheduler::new(ctx).unwrap();

    let (tx, rx) = mpsc::unbounded_channel();
    let handle = tokio::spawn(scheduler.run_with_events(rx));

    let style = dir.path().join("source/css/style.css");
    write_file(dir.path(), "source/css/style.css", broken);
    tx.send(style.clone()).unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(!dir.path().join("build/css/style.css").exists());
    assert!(!handle.is_finished());

    write_file(dir.path(), "source/css/style.css", fixed);
    tx.send(style).unwrap();
    drop(tx);

    with_timeout(handle).await.unwrap().unwrap();
    std::fs::read_to_string(dir.path().join("build/css/style.css")).unwrap()
}

#[tokio::test]
async fn unresolved_import_does_not_stop_watching() {
    init_tracing();
    let css = edit_broken_then_fixed("@import \"missing.css\";", "body {\n  margin: 0;\n}\n").await;
    assert_eq!(css, "body{margin:0}");
}

#[tokio::test]
async fn syntax_error_does_not_stop_watching() {
    init_tracing();
    let css = edit_broken_then_fixed(
        "body {\n  margin: 0;\n}}\n",
        "body {\n  margin: 0;\n}\n.header {\n  color: red;\n}\n",
    )
    .await;
    assert_eq!(css, "body{margin:0}.header{color:red}");
}
