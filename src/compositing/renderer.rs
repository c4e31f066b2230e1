//! Turning a composite request into a finished raster

use async_trait::async_trait;
use image::RgbaImage;
use std::sync::Arc;

use super::engine::Compositor;
use crate::assets::{BackgroundSupplier, IconResolver};
use crate::errors::SpriteResult;
use crate::sprites::key::CompositeRequest;

/// Produces the raster for a request; invoked once per cache miss
#[async_trait]
pub trait SpriteRenderer: Send + Sync {
    async fn render(&self, request: &CompositeRequest) -> SpriteResult<RgbaImage>;
}

/// Renderer that loads the icon, picks the background and composites
pub struct AssetCompositor {
    compositor: Compositor,
    backgrounds: Arc<dyn BackgroundSupplier>,
    icons: IconResolver,
}

impl AssetCompositor {
    pub fn new(
        compositor: Compositor,
        backgrounds: Arc<dyn BackgroundSupplier>,
        icons: IconResolver,
    ) -> Self {
        Self {
            compositor,
            backgrounds,
            icons,
        }
    }
}

#[async_trait]
impl SpriteRenderer for AssetCompositor {
    async fn render(&self, request: &CompositeRequest) -> SpriteResult<RgbaImage> {
        let background = self
            .backgrounds
            .background(request.variant.background_bucket());
        let icon = self.icons.resolve(request).await;

        let raster = self.compositor.composite(
            request.variant,
            background.as_deref(),
            &request.label_text,
            Some(&icon),
        )?;
        Ok(raster)
    }
}
