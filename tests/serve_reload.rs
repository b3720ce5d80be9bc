mod common;

use assetdag::config::{PlanConfig, StageConfig, TaskKind};
use assetdag::server::ReloadKind;
use assetdag::types::ReloadMode;
use assetdag_test_utils::builders::{parallel, series, ConfigFileBuilder, TaskConfigBuilder};
use tempfile::tempdir;

use common::{context_from, init_tracing, with_timeout, write_file};

fn config() -> assetdag::config::ConfigFile {
    ConfigFileBuilder::new()
        .port(0)
        .with_task("server", TaskConfigBuilder::kind(TaskKind::Serve).build())
        .with_task("reload", TaskConfigBuilder::kind(TaskKind::Reload).build())
        .with_task(
            "html",
            TaskConfigBuilder::process(&["source/*.html"], "build").build(),
        )
        .with_task(
            "styles",
            TaskConfigBuilder::process(&["source/css/*.css"], "build/css")
                .reload(ReloadMode::Inject)
                .build(),
        )
        .with_pipeline("html-then-reload", series(&["html", "reload"]))
        .build()
}

#[tokio::test]
async fn reload_without_server_is_a_no_op() {
    init_tracing();
    let dir = tempdir().unwrap();
    let ctx = context_from(dir.path(), config());

    with_timeout(ctx.run_named("reload")).await.unwrap();
    assert!(ctx.reloader().is_none());
}

#[tokio::test]
async fn serve_installs_one_session_and_reload_follows_processing() {
    init_tracing();
    let dir = tempdir().unwrap();
    write_file(dir.path(), "source/index.html", "<p>v1</p>");
    let ctx = context_from(dir.path(), config());

    with_timeout(ctx.run_named("server")).await.unwrap();
    let addr = ctx.session().unwrap().addr();
    assert_ne!(addr.port(), 0);

    // Serving twice keeps the original session.
    with_timeout(ctx.run_named("server")).await.unwrap();
    assert_eq!(ctx.session().unwrap().addr(), addr);

    let reloader = ctx.reloader().unwrap();
    assert_eq!(reloader.current_seq(), 0);

    with_timeout(ctx.run_named("html-then-reload")).await.unwrap();
    assert!(dir.path().join("build/index.html").exists());
    let signals = reloader.since(0);
    assert_eq!(signals.len(), 1);
    assert_eq!(signals[0].kind, ReloadKind::Full);
}

#[tokio::test]
async fn stylesheet_task_injects_instead_of_reloading() {
    init_tracing();
    let dir = tempdir().unwrap();
    write_file(dir.path(), "source/css/site.css", "a{}");
    let ctx = context_from(dir.path(), config());

    with_timeout(ctx.run_named("server")).await.unwrap();
    with_timeout(ctx.run_named("styles")).await.unwrap();

    let signals = ctx.reloader().unwrap().since(0);
    assert_eq!(
        signals.iter().map(|s| s.kind.clone()).collect::<Vec<_>>(),
        vec![ReloadKind::Inject {
            path: "/css/site.css".into()
        }]
    );
}

#[tokio::test]
async fn failed_initial_build_never_starts_the_server() {
    init_tracing();
    let dir = tempdir().unwrap();
    write_file(dir.path(), "source/js/broken.js", "function (");

    let config = ConfigFileBuilder::new()
        .port(0)
        .with_task("clean", TaskConfigBuilder::kind(TaskKind::Clean).build())
        .with_task(
            "broken-js",
            TaskConfigBuilder::process(&["source/js/*.js"], "build/js")
                .stage(StageConfig::Js)
                .build(),
        )
        .with_task("server", TaskConfigBuilder::kind(TaskKind::Serve).build())
        .with_task("watcher", TaskConfigBuilder::kind(TaskKind::Watch).build())
        .with_pipeline(
            "default",
            PlanConfig::Series {
                series: vec![
                    PlanConfig::Name("clean".into()),
                    parallel(&["broken-js"]),
                    series(&["server", "watcher"]),
                ],
            },
        )
        .build();
    let ctx = context_from(dir.path(), config);

    let err = with_timeout(ctx.run_named("default")).await.unwrap_err();
    assert!(err.is_stage_failure(), "got {err:?}");
    assert!(ctx.session().is_none());
}
