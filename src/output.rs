// src/output.rs

//! Output directory management: wiping the tree before a build and writing
//! processed assets (plus their source maps) into it.

use std::path::{Component, Path, PathBuf};

use anyhow::{bail, Context};
use tracing::{debug, info};

use crate::errors::Result;
use crate::fs::FileSystem;
use crate::stages::Asset;

/// Recursively delete `dir`.
///
/// Idempotent: an absent directory is a successful no-op. Returns whether
/// anything was removed.
pub fn clean(fs: &dyn FileSystem, dir: &Path) -> Result<bool> {
    let removed = fs.remove_dir_all(dir)?;
    if removed {
        info!(dir = ?dir, "output directory removed");
    } else {
        debug!(dir = ?dir, "output directory already absent");
    }
    Ok(removed)
}

fn source_map_comment(asset: &Asset, map_name: &str) -> String {
    match asset.extension().as_deref() {
        Some("css") => format!("\n/*# sourceMappingURL={map_name} */\n"),
        _ => format!("\n//# sourceMappingURL={map_name}\n"),
    }
}

fn ensure_contained(rel: &Path) -> anyhow::Result<()> {
    let escapes = rel
        .components()
        .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)));
    if escapes || rel.as_os_str().is_empty() {
        bail!("output path {} escapes the destination directory", rel.display());
    }
    Ok(())
}

/// Write `assets` under `dest`, returning every path written.
///
/// An asset carrying a source map gets a sibling `<file>.map` and a
/// `sourceMappingURL` comment appended to its contents.
pub fn write_assets(fs: &dyn FileSystem, dest: &Path, assets: &[Asset]) -> Result<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(assets.len());

    for asset in assets {
        ensure_contained(&asset.rel)?;
        let target = dest.join(&asset.rel);

        match &asset.source_map {
            Some(map) => {
                let file_name = target
                    .file_name()
                    .context("asset path has no file name")?
                    .to_string_lossy()
                    .into_owned();
                let map_name = format!("{file_name}.map");
                let map_path = target.with_file_name(&map_name);

                let mut contents = asset.contents.clone();
                contents.extend_from_slice(source_map_comment(asset, &map_name).as_bytes());

                fs.write(&target, &contents)?;
                fs.write(&map_path, map.as_bytes())?;
                written.push(target);
                written.push(map_path);
            }
            None => {
                fs.write(&target, &asset.contents)?;
                written.push(target);
            }
        }
    }

    Ok(written)
}
