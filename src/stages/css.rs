// src/stages/css.rs

//! Stylesheet compilation with `lightningcss`.
//!
//! The asset's contents are the entry sheet, so an earlier stage (a LESS
//! compiler, say) may have produced them; `@import` partials are read from
//! disk relative to the file the asset came from and inlined. The bundle is
//! lowered for the configured browserslist `targets` (vendor prefixes
//! included) and minified. With source maps enabled the map JSON is attached
//! to the asset; the owning task writes it next to the stylesheet.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use lightningcss::bundler::{Bundler, FileProvider, SourceProvider};
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions};
use lightningcss::targets::{Browsers, Targets};
use parcel_sourcemap::SourceMap;

use super::{blocking, Asset, BoxFuture, Stage};

/// Serves the in-memory entry sheet; everything else comes from disk.
struct EntryProvider {
    entry: PathBuf,
    contents: String,
    files: FileProvider,
}

impl SourceProvider for EntryProvider {
    type Error = std::io::Error;

    fn read<'a>(&'a self, file: &Path) -> std::result::Result<&'a str, Self::Error> {
        if file == self.entry {
            Ok(&self.contents)
        } else {
            self.files.read(file)
        }
    }

    fn resolve(&self, specifier: &str, originating_file: &Path) -> std::result::Result<PathBuf, Self::Error> {
        self.files.resolve(specifier, originating_file)
    }
}

#[derive(Debug, Clone)]
pub struct CssStage {
    targets: Vec<String>,
    source_maps: bool,
}

impl CssStage {
    pub fn new(targets: Vec<String>, source_maps: bool) -> Self {
        Self {
            targets,
            source_maps,
        }
    }

    fn targets(&self) -> Result<Targets> {
        if self.targets.is_empty() {
            return Ok(Targets::default());
        }
        let browsers = Browsers::from_browserslist(self.targets.iter())
            .map_err(|e| anyhow!("invalid browserslist query {:?}: {e}", self.targets))?;
        Ok(browsers.map(Targets::from).unwrap_or_default())
    }

    fn compile(&self, asset: Asset) -> Result<Asset> {
        let entry: PathBuf = asset
            .source
            .clone()
            .ok_or_else(|| anyhow!("{} has no entry file on disk", asset.rel.display()))?;
        let targets = self.targets()?;

        let provider = EntryProvider {
            entry: entry.clone(),
            contents: asset.text()?.to_string(),
            files: FileProvider::new(),
        };
        let mut source_map = SourceMap::new("/");

        let mut stylesheet = {
            let map_sink = if self.source_maps {
                Some(&mut source_map)
            } else {
                None
            };
            let mut bundler = Bundler::new(&provider, map_sink, ParserOptions::default());
            bundler
                .bundle(&entry)
                .map_err(|e| anyhow!("{}: {e}", entry.display()))?
        };

        stylesheet
            .minify(MinifyOptions {
                targets: targets.clone(),
                ..MinifyOptions::default()
            })
            .map_err(|e| anyhow!("{}: {e}", entry.display()))?;

        let printed = stylesheet
            .to_css(PrinterOptions {
                minify: true,
                source_map: self.source_maps.then_some(&mut source_map),
                targets,
                ..PrinterOptions::default()
            })
            .map_err(|e| anyhow!("{}: {e}", entry.display()))?;

        let map = if self.source_maps {
            Some(
                source_map
                    .to_json(None)
                    .map_err(|e| anyhow!("serialising source map: {e:?}"))?,
            )
        } else {
            None
        };

        let mut rel = asset.rel;
        rel.set_extension("css");

        Ok(Asset {
            rel,
            contents: printed.code.into_bytes(),
            source: Some(entry),
            source_map: map,
        })
    }
}

impl Stage for CssStage {
    fn name(&self) -> &'static str {
        "css"
    }

    fn apply(&self, assets: Vec<Asset>) -> BoxFuture<'_, Result<Vec<Asset>>> {
        let this = self.clone();
        blocking(move || assets.into_iter().map(|a| this.compile(a)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry_asset(dir: &std::path::Path) -> Asset {
        let entry = dir.join("style.css");
        Asset::new("style.css", std::fs::read(&entry).unwrap()).with_source(entry)
    }

    #[tokio::test]
    async fn bundles_imported_partial_and_minifies() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("blocks")).unwrap();
        std::fs::write(
            dir.path().join("style.css"),
            "@import \"blocks/header.css\";\n\nbody {\n  margin: 0;\n}\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("blocks/header.css"),
            ".header {\n  color: #ff0000;\n}\n",
        )
        .unwrap();

        let stage = CssStage::new(Vec::new(), true);
        let out = stage.apply(vec![entry_asset(dir.path())]).await.unwrap();

        assert_eq!(out.len(), 1);
        let css = out[0].text().unwrap();
        assert!(css.contains(".header{color:"), "got {css}");
        assert!(!css.contains('\n'), "got {css}");
        assert!(css.contains("body{margin:0}"), "got {css}");
        assert!(!css.contains("@import"));
        assert!(out[0].source_map.as_deref().unwrap().contains("\"mappings\""));
    }

    #[tokio::test]
    async fn entry_contents_come_from_the_asset() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("header.css"), ".header{color:blue}").unwrap();
        let entry = dir.path().join("style.less");
        std::fs::write(&entry, "@brand: red;\nbody { color: @brand; }").unwrap();

        let compiled = Asset::new("style.less", "@import \"header.css\";\nbody { color: red; }")
            .with_source(&entry);
        let out = CssStage::new(Vec::new(), false).apply(vec![compiled]).await.unwrap();

        assert_eq!(out[0].rel, PathBuf::from("style.css"));
        let css = out[0].text().unwrap();
        assert!(css.contains(".header{color:"), "got {css}");
        assert!(css.contains("body{color:red}"), "got {css}");
    }

    #[tokio::test]
    async fn syntax_error_fails_the_stage() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("style.css"), "body {\n  margin: 0;\n}}\n").unwrap();

        let stage = CssStage::new(Vec::new(), false);
        assert!(stage.apply(vec![entry_asset(dir.path())]).await.is_err());
    }

    #[tokio::test]
    async fn unresolvable_import_fails_the_stage() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("style.css"), "@import \"missing.css\";").unwrap();

        let stage = CssStage::new(Vec::new(), false);
        assert!(stage.apply(vec![entry_asset(dir.path())]).await.is_err());
    }
}
