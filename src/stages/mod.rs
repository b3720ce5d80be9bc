// src/stages/mod.rs

//! Processing stages.
//!
//! A stage is an opaque transformation from a batch of [`Asset`]s to a new
//! batch. Processing tasks chain them in the order listed in the config.
//! The heavy lifting is delegated to existing libraries:
//!
//! - [`css`]: `lightningcss` bundling, lowering and minification.
//! - [`js`]: `minify-js`.
//! - [`image`]: `image` re-encoding and WebP generation.
//! - [`html`]: `minify-html`.
//! - [`svg`]: `roxmltree` parse-and-rewrite cleanup, plus sprite stacking.
//! - [`command`]: any external tool that reads stdin and writes stdout.
//!
//! CPU-bound stages run on Tokio's blocking pool via [`blocking`], so the
//! single-threaded scheduler keeps making progress on sibling tasks.

use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use anyhow::{Context, Result};

use crate::config::StageConfig;

pub mod command;
pub mod css;
pub mod html;
pub mod image;
pub mod js;
pub mod rename;
pub mod svg;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// One file flowing through a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    /// Output path relative to the task's destination directory.
    pub rel: PathBuf,
    pub contents: Vec<u8>,
    /// File the asset was read from, if any.
    pub source: Option<PathBuf>,
    /// Source map JSON to be written alongside the asset.
    pub source_map: Option<String>,
}

impl Asset {
    pub fn new(rel: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            rel: rel.into(),
            contents: contents.into(),
            source: None,
            source_map: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<PathBuf>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Lower-cased extension of the output path.
    pub fn extension(&self) -> Option<String> {
        self.rel
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
    }

    pub fn text(&self) -> Result<&str> {
        std::str::from_utf8(&self.contents)
            .with_context(|| format!("{} is not valid UTF-8", self.rel.display()))
    }
}

/// A transformation applied to every asset of a task invocation.
pub trait Stage: Send + Sync + fmt::Debug {
    /// Short name used in logs and errors (matches the config `kind`).
    fn name(&self) -> &'static str;

    fn apply(&self, assets: Vec<Asset>) -> BoxFuture<'_, Result<Vec<Asset>>>;
}

/// Run a CPU-bound stage body on the blocking pool.
pub(crate) fn blocking<F>(work: F) -> BoxFuture<'static, Result<Vec<Asset>>>
where
    F: FnOnce() -> Result<Vec<Asset>> + Send + 'static,
{
    Box::pin(async move {
        tokio::task::spawn_blocking(work)
            .await
            .context("stage worker panicked")?
    })
}

/// Instantiate the stage described by `cfg`.
///
/// `sourcemaps` is the owning task's `sourcemaps` flag.
pub fn build_stage(cfg: &StageConfig, sourcemaps: bool) -> Box<dyn Stage> {
    match cfg {
        StageConfig::Css { targets } => Box::new(css::CssStage::new(targets.clone(), sourcemaps)),
        StageConfig::Rename { to } => Box::new(rename::RenameStage::new(to.clone())),
        StageConfig::Html => Box::new(html::HtmlStage),
        StageConfig::Js => Box::new(js::JsStage),
        StageConfig::Optimize { quality } => Box::new(image::OptimizeStage::new(*quality)),
        StageConfig::Webp => Box::new(image::WebpStage),
        StageConfig::Svgo => Box::new(svg::SvgoStage),
        StageConfig::Sprite { file } => Box::new(svg::SpriteStage::new(file.clone())),
        StageConfig::Command { cmd } => Box::new(command::CommandStage::new(cmd.clone())),
    }
}
