// src/stages/image.rs

//! Raster image stages built on the `image` crate.

use std::io::Cursor;

use anyhow::{Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::codecs::webp::WebPEncoder;
use image::DynamicImage;
use tracing::trace;

use super::{blocking, Asset, BoxFuture, Stage};

const DEFAULT_JPEG_QUALITY: u8 = 75;

fn decode(asset: &Asset) -> Result<DynamicImage> {
    image::load_from_memory(&asset.contents)
        .with_context(|| format!("decoding {}", asset.rel.display()))
}

/// Lossless re-compression of PNG and quality-bounded JPEG re-encoding.
///
/// Other formats (and re-encodes that come out larger) pass through
/// unchanged.
#[derive(Debug, Clone, Copy)]
pub struct OptimizeStage {
    quality: u8,
}

impl OptimizeStage {
    pub fn new(quality: Option<u8>) -> Self {
        Self {
            quality: quality.unwrap_or(DEFAULT_JPEG_QUALITY),
        }
    }

    fn optimize(&self, mut asset: Asset) -> Result<Asset> {
        let encoded = match asset.extension().as_deref() {
            Some("png") => {
                let img = decode(&asset)?;
                let mut out = Vec::new();
                let encoder = PngEncoder::new_with_quality(
                    &mut out,
                    CompressionType::Best,
                    FilterType::Adaptive,
                );
                img.write_with_encoder(encoder)
                    .with_context(|| format!("encoding {}", asset.rel.display()))?;
                out
            }
            Some("jpg" | "jpeg") => {
                let img = decode(&asset)?.to_rgb8();
                let mut out = Vec::new();
                let encoder = JpegEncoder::new_with_quality(&mut out, self.quality);
                DynamicImage::ImageRgb8(img)
                    .write_with_encoder(encoder)
                    .with_context(|| format!("encoding {}", asset.rel.display()))?;
                out
            }
            _ => return Ok(asset),
        };

        if encoded.len() < asset.contents.len() {
            trace!(
                file = %asset.rel.display(),
                before = asset.contents.len(),
                after = encoded.len(),
                "image optimised"
            );
            asset.contents = encoded;
        }
        Ok(asset)
    }
}

impl Stage for OptimizeStage {
    fn name(&self) -> &'static str {
        "optimize"
    }

    fn apply(&self, assets: Vec<Asset>) -> BoxFuture<'_, Result<Vec<Asset>>> {
        let this = *self;
        blocking(move || assets.into_iter().map(|a| this.optimize(a)).collect())
    }
}

/// Convert every raster image to lossless WebP, replacing the extension.
#[derive(Debug, Clone, Copy)]
pub struct WebpStage;

fn to_webp(asset: Asset) -> Result<Asset> {
    let img = decode(&asset)?.to_rgba8();
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(img)
        .write_with_encoder(WebPEncoder::new_lossless(&mut out))
        .with_context(|| format!("encoding {} as webp", asset.rel.display()))?;

    let mut rel = asset.rel;
    rel.set_extension("webp");
    Ok(Asset {
        rel,
        contents: out.into_inner(),
        source: asset.source,
        source_map: None,
    })
}

impl Stage for WebpStage {
    fn name(&self) -> &'static str {
        "webp"
    }

    fn apply(&self, assets: Vec<Asset>) -> BoxFuture<'_, Result<Vec<Asset>>> {
        blocking(move || assets.into_iter().map(to_webp).collect())
    }
}
