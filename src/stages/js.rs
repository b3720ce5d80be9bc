// src/stages/js.rs

use anyhow::{anyhow, Result};
use minify_js::{minify, Session, TopLevelMode};

use super::{blocking, Asset, BoxFuture, Stage};

/// Script minification via `minify-js`.
#[derive(Debug, Clone, Copy)]
pub struct JsStage;

fn minify_script(asset: &Asset) -> Result<Vec<u8>> {
    let session = Session::new();
    let mut out = Vec::with_capacity(asset.contents.len());
    minify(&session, TopLevelMode::Global, &asset.contents, &mut out)
        .map_err(|e| anyhow!("{}: {e:?}", asset.rel.display()))?;
    Ok(out)
}

impl Stage for JsStage {
    fn name(&self) -> &'static str {
        "js"
    }

    fn apply(&self, assets: Vec<Asset>) -> BoxFuture<'_, Result<Vec<Asset>>> {
        blocking(move || {
            assets
                .into_iter()
                .map(|mut asset| {
                    asset.contents = minify_script(&asset)?;
                    Ok(asset)
                })
                .collect()
        })
    }
}
