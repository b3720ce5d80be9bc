#![cfg(unix)]

mod common;

use std::io::Cursor;
use std::path::Path;

use assetdag::config::{load_builtin, ConfigFile, StageConfig};
use image::{ImageFormat, Rgba, RgbaImage};
use tempfile::tempdir;

use common::{context_from, init_tracing, tree, with_timeout, write_file};

fn png_bytes() -> Vec<u8> {
    let img = RgbaImage::from_fn(8, 8, |x, _| Rgba([(x * 30) as u8, 120, 200, 255]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

/// Built-in config with `lessc` swapped for `cat`. The fixture stylesheets
/// are plain CSS, which LESS passes through unchanged, so the rest of the
/// styles chain sees the same input either way.
fn builtin_config() -> ConfigFile {
    let mut cfg = load_builtin().unwrap();
    let styles = cfg.task.get_mut("styles").unwrap();
    assert!(matches!(&styles.stages[0], StageConfig::Command { cmd } if cmd.starts_with("lessc")));
    styles.stages[0] = StageConfig::Command { cmd: "cat".into() };
    cfg
}

fn lessc_available() -> bool {
    std::process::Command::new("lessc")
        .arg("--version")
        .output()
        .is_ok_and(|o| o.status.success())
}

fn site_fixture(root: &Path) {
    write_file(
        root,
        "source/less/style.less",
        "@import \"blocks/header.less\";\n\nbody {\n  margin: 0;\n}\n",
    );
    write_file(root, "source/less/blocks/header.less", ".header {\n  display: flex;\n}\n");
    write_file(
        root,
        "source/index.html",
        "<!DOCTYPE html>\n<html>\n  <body>\n    <h1>Hi</h1>\n  </body>\n</html>\n",
    );
    write_file(root, "source/js/app.js", "function add(first, second) {\n  return first + second;\n}\nwindow.add = add;\n");
    write_file(root, "source/img/photo.png", png_bytes());
    write_file(root, "source/img/favicons/icon-192.png", png_bytes());
    write_file(
        root,
        "source/img/favicons/favicon.svg",
        "<svg xmlns=\"http://www.w3.org/2000/svg\" viewBox=\"0 0 8 8\">\n  <rect width=\"8\" height=\"8\"/>\n</svg>\n",
    );
    write_file(
        root,
        "source/img/logo.svg",
        "<?xml version=\"1.0\"?>\n<svg xmlns=\"http://www.w3.org/2000/svg\" viewBox=\"0 0 4 4\">\n  <!-- logo -->\n  <circle r=\"2\"/>\n</svg>\n",
    );
    write_file(
        root,
        "source/img/icons/menu.svg",
        "<svg xmlns=\"http://www.w3.org/2000/svg\" viewBox=\"0 0 24 24\"><path d=\"M3 6h18\"/></svg>",
    );
    write_file(root, "source/fonts/inter.woff2", "font-bytes");
    write_file(root, "source/favicon.ico", "ico-bytes");
    write_file(root, "source/manifest.webmanifest", "{}");
}

#[tokio::test]
async fn build_produces_the_published_layout() {
    init_tracing();
    let dir = tempdir().unwrap();
    site_fixture(dir.path());
    // Stale output from an earlier build must disappear.
    write_file(dir.path(), "build/old.txt", "stale");

    let ctx = context_from(dir.path(), builtin_config());
    with_timeout(ctx.run_named("build")).await.unwrap();

    let build = dir.path().join("build");
    assert_eq!(
        tree(&build),
        vec![
            "css/style.min.css",
            "css/style.min.css.map",
            "favicon.ico",
            "fonts/inter.woff2",
            "img/favicons/favicon.svg",
            "img/favicons/icon-192.png",
            "img/logo.svg",
            "img/photo.png",
            "img/photo.webp",
            "img/stack.svg",
            "index.html",
            "js/app.js",
            "manifest.webmanifest",
        ]
    );
}

#[tokio::test]
async fn stylesheet_is_bundled_minified_and_mapped() {
    init_tracing();
    let dir = tempdir().unwrap();
    site_fixture(dir.path());

    let ctx = context_from(dir.path(), builtin_config());
    with_timeout(ctx.run_named("build")).await.unwrap();

    let css = std::fs::read_to_string(dir.path().join("build/css/style.min.css")).unwrap();
    assert!(css.contains(".header{"), "got {css}");
    assert!(css.contains("display:flex"), "got {css}");
    assert!(!css.contains("@import"), "got {css}");
    assert!(css.contains("body{margin:0}"), "got {css}");
    assert!(css.trim_end().ends_with("/*# sourceMappingURL=style.min.css.map */"));

    let map: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(dir.path().join("build/css/style.min.css.map")).unwrap(),
    )
    .unwrap();
    assert_eq!(map["version"], 3);
}

#[tokio::test]
async fn favicons_get_no_webp_variant() {
    init_tracing();
    let dir = tempdir().unwrap();
    write_file(dir.path(), "source/img/favicons/icon.png", png_bytes());

    let ctx = context_from(dir.path(), builtin_config());
    with_timeout(ctx.run_named("build")).await.unwrap();

    let img = dir.path().join("build/img");
    assert_eq!(tree(&img), vec!["favicons/icon.png"]);
}

#[tokio::test]
async fn sprite_and_markup_are_processed() {
    init_tracing();
    let dir = tempdir().unwrap();
    site_fixture(dir.path());

    let ctx = context_from(dir.path(), builtin_config());
    with_timeout(ctx.run_named("build")).await.unwrap();

    let stack = std::fs::read_to_string(dir.path().join("build/img/stack.svg")).unwrap();
    assert!(stack.contains("<svg id=\"menu\" viewBox=\"0 0 24 24\">"));

    let logo = std::fs::read_to_string(dir.path().join("build/img/logo.svg")).unwrap();
    assert!(!logo.contains("<?xml"));
    assert!(!logo.contains("<!--"));

    let html = std::fs::read_to_string(dir.path().join("build/index.html")).unwrap();
    assert!(html.starts_with("<!DOCTYPE html><html>"), "got {html}");
    assert!(html.contains("<h1>Hi</h1>"), "got {html}");
    assert!(!html.contains('\n'), "got {html}");
}

#[tokio::test]
async fn empty_source_tree_builds_nothing_without_error() {
    init_tracing();
    let dir = tempdir().unwrap();

    let ctx = context_from(dir.path(), builtin_config());
    let reports = with_timeout(ctx.run_named("build")).await.unwrap();

    assert!(reports.iter().all(|r| r.written.is_empty()));
    assert!(tree(&dir.path().join("build")).is_empty());
}

#[tokio::test]
async fn unguarded_stage_failure_fails_the_build() {
    init_tracing();
    let dir = tempdir().unwrap();
    write_file(dir.path(), "source/js/broken.js", "function (");

    let ctx = context_from(dir.path(), builtin_config());
    let err = with_timeout(ctx.run_named("build")).await.unwrap_err();
    assert!(err.is_stage_failure(), "got {err:?}");
}

#[tokio::test]
async fn guarded_style_failure_is_isolated() {
    init_tracing();
    let dir = tempdir().unwrap();
    write_file(dir.path(), "source/less/style.less", "@import \"missing.less\";\n");

    let ctx = context_from(dir.path(), builtin_config());
    let reports = with_timeout(ctx.run_named("build")).await.unwrap();

    let styles = reports.iter().find(|r| r.task == "styles").unwrap();
    assert!(styles.isolated_failure.is_some());
    assert!(!dir.path().join("build/css/style.min.css").exists());
}

#[tokio::test]
async fn malformed_stylesheet_is_isolated() {
    init_tracing();
    let dir = tempdir().unwrap();
    write_file(dir.path(), "source/less/style.less", "body {\n  margin: 0;\n}}\n");
    write_file(dir.path(), "source/index.html", "<p>ok</p>");

    let ctx = context_from(dir.path(), builtin_config());
    let reports = with_timeout(ctx.run_named("build")).await.unwrap();

    let styles = reports.iter().find(|r| r.task == "styles").unwrap();
    assert!(styles.isolated_failure.is_some());
    assert!(!dir.path().join("build/css/style.min.css").exists());
    assert!(dir.path().join("build/index.html").exists());
}

#[tokio::test]
async fn less_entry_and_partials_compile_with_lessc() {
    if !lessc_available() {
        eprintln!("lessc not on PATH; skipping");
        return;
    }
    init_tracing();
    let dir = tempdir().unwrap();
    write_file(
        dir.path(),
        "source/less/style.less",
        "@brand: red;\n@import \"blocks/header.less\";\n\nbody {\n  margin: 0;\n}\n",
    );
    write_file(
        dir.path(),
        "source/less/blocks/header.less",
        ".header {\n  color: @brand;\n}\n",
    );

    let ctx = context_from(dir.path(), load_builtin().unwrap());
    with_timeout(ctx.run_named("build")).await.unwrap();

    let css = std::fs::read_to_string(dir.path().join("build/css/style.min.css")).unwrap();
    assert!(css.contains(".header{color:red}"), "got {css}");
    assert!(css.contains("body{margin:0}"), "got {css}");
    assert!(!css.contains('@'), "got {css}");
}
