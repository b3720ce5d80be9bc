// src/stages/rename.rs

use anyhow::Result;
use tracing::warn;

use super::{Asset, BoxFuture, Stage};

/// Replace the file name of every asset, keeping its directory.
#[derive(Debug, Clone)]
pub struct RenameStage {
    to: String,
}

impl RenameStage {
    pub fn new(to: String) -> Self {
        Self { to }
    }
}

impl Stage for RenameStage {
    fn name(&self) -> &'static str {
        "rename"
    }

    fn apply(&self, mut assets: Vec<Asset>) -> BoxFuture<'_, Result<Vec<Asset>>> {
        if assets.len() > 1 {
            warn!(
                to = %self.to,
                count = assets.len(),
                "rename applied to several assets; later ones overwrite earlier ones"
            );
        }
        for asset in &mut assets {
            asset.rel.set_file_name(&self.to);
        }
        Box::pin(async move { Ok(assets) })
    }
}
