//! Pill-shaped backgrounds per style bucket

use image::{Rgba, RgbaImage};
use std::sync::Arc;
use tracing::{info, warn};

use super::loader::AssetLoader;
use crate::compositing::draw::{pill_shape, scale_to, tint_source_atop};
use crate::config::{AssetConfig, LayoutConfig, Size};
use crate::errors::{LoaderError, LoaderResult};
use crate::sprites::key::BackgroundBucket;

const PLAIN_TINT: Rgba<u8> = Rgba([0, 0, 0, 255]);
const PLAIN_TINT_STRENGTH: f32 = 0.9;
/// Used when no highlight image exists (#2f3b73)
const EMPHASIZED_TINT: Rgba<u8> = Rgba([0x2f, 0x3b, 0x73, 255]);

/// Supplies the background raster for a bucket
pub trait BackgroundSupplier: Send + Sync {
    fn background(&self, bucket: BackgroundBucket) -> Option<Arc<RgbaImage>>;
}

/// The three prepared backgrounds
#[derive(Debug, Clone)]
pub struct BackgroundSet {
    plain: Arc<RgbaImage>,
    emphasized: Arc<RgbaImage>,
    hover: Arc<RgbaImage>,
}

impl BackgroundSet {
    /// Prepare backgrounds from the raw source images
    ///
    /// `plain` is `base` darkened; `emphasized` is `highlight` as-is or `base`
    /// tinted blue; `hover` is its own image or a copy of `emphasized`.
    pub fn from_sources(
        base: &RgbaImage,
        highlight: Option<&RgbaImage>,
        hover: Option<&RgbaImage>,
        layout: &LayoutConfig,
    ) -> Self {
        let compact = layout.compact_size;
        let emphasized_size = layout.emphasized_size;

        let plain = fit(
            &tint_source_atop(base, PLAIN_TINT, PLAIN_TINT_STRENGTH),
            compact,
        );
        let emphasized_source = match highlight {
            Some(highlight) => highlight.clone(),
            None => tint_source_atop(base, EMPHASIZED_TINT, 1.0),
        };
        let emphasized = fit(&emphasized_source, emphasized_size);
        let hover = match hover {
            Some(hover) => fit(hover, compact),
            None => fit(&emphasized_source, compact),
        };

        Self {
            plain: Arc::new(plain),
            emphasized: Arc::new(emphasized),
            hover: Arc::new(hover),
        }
    }

    /// Plain pills when no background artwork is configured
    pub fn synthesized(layout: &LayoutConfig) -> Self {
        let base = pill_shape(layout.emphasized_size, Rgba([255, 255, 255, 255]));
        Self::from_sources(&base, None, None, layout)
    }

    /// Load the configured artwork; optional images that fail to load are
    /// treated as absent
    pub async fn load(
        loader: &dyn AssetLoader,
        assets: &AssetConfig,
        layout: &LayoutConfig,
    ) -> LoaderResult<Self> {
        let base_url = assets
            .base_background
            .as_deref()
            .ok_or_else(|| LoaderError::fetch("", "no base background configured"))?;
        let base = loader.load(base_url).await?;

        let highlight = load_optional(loader, assets.emphasized_background.as_deref()).await;
        let hover = load_optional(loader, assets.hover_background.as_deref()).await;

        info!(
            "Loaded marker backgrounds (highlight: {}, hover: {})",
            highlight.is_some(),
            hover.is_some()
        );
        Ok(Self::from_sources(
            &base,
            highlight.as_ref(),
            hover.as_ref(),
            layout,
        ))
    }

    pub fn get(&self, bucket: BackgroundBucket) -> Arc<RgbaImage> {
        match bucket {
            BackgroundBucket::Plain => self.plain.clone(),
            BackgroundBucket::Emphasized => self.emphasized.clone(),
            BackgroundBucket::Hover => self.hover.clone(),
        }
    }
}

impl BackgroundSupplier for BackgroundSet {
    fn background(&self, bucket: BackgroundBucket) -> Option<Arc<RgbaImage>> {
        Some(self.get(bucket))
    }
}

fn fit(source: &RgbaImage, size: Size) -> RgbaImage {
    if source.width() == 0 || source.height() == 0 {
        return source.clone();
    }
    scale_to(source, size.width, size.height)
}

async fn load_optional(loader: &dyn AssetLoader, url: Option<&str>) -> Option<RgbaImage> {
    let url = url?;
    match loader.load(url).await {
        Ok(image) => Some(image),
        Err(e) => {
            warn!(url = %url, error = %e, "Optional background unavailable");
            None
        }
    }
}
