//! Icon and thumbnail resolution with a placeholder as the last resort

use image::{Rgba, RgbaImage};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use super::loader::AssetLoader;
use crate::compositing::draw::solid_square;
use crate::config::LayoutConfig;
use crate::errors::{LoaderError, LoaderResult};
use crate::sprites::key::CompositeRequest;

/// Finds the picture to draw next to a label
///
/// Emphasized requests with a thumbnail try the thumbnail first, then the URL
/// registered for the icon key, then fall back to a solid placeholder. Loader
/// failures are logged and never surface to the caller.
#[derive(Clone)]
pub struct IconResolver {
    loader: Arc<dyn AssetLoader>,
    icons: HashMap<String, String>,
    placeholder_color: Rgba<u8>,
    compact_icon_size: u32,
    emphasized_icon_size: u32,
}

impl IconResolver {
    pub fn new(
        loader: Arc<dyn AssetLoader>,
        icons: HashMap<String, String>,
        layout: &LayoutConfig,
    ) -> Self {
        Self {
            loader,
            icons,
            placeholder_color: Rgba(layout.placeholder_color),
            compact_icon_size: layout.compact_icon_size,
            emphasized_icon_size: layout.emphasized_icon_size,
        }
    }

    pub fn icon_url(&self, icon_key: &str) -> Option<&str> {
        self.icons.get(icon_key).map(String::as_str)
    }

    async fn load_icon(&self, icon_key: &str) -> LoaderResult<RgbaImage> {
        let url = self
            .icon_url(icon_key)
            .ok_or_else(|| LoaderError::UnknownIcon {
                icon_key: icon_key.to_string(),
            })?;
        self.loader.load(url).await
    }

    pub fn placeholder(&self, request: &CompositeRequest) -> RgbaImage {
        let size = if request.variant.is_emphasized() {
            self.emphasized_icon_size
        } else {
            self.compact_icon_size
        };
        solid_square(size, self.placeholder_color)
    }

    pub async fn resolve(&self, request: &CompositeRequest) -> RgbaImage {
        if request.variant.is_emphasized() {
            if let Some(url) = request.thumbnail_url.as_deref().filter(|u| !u.is_empty()) {
                match self.loader.load(url).await {
                    Ok(image) => return image,
                    Err(e) => {
                        warn!(url = %url, error = %e, "Thumbnail unavailable, falling back to icon")
                    }
                }
            }
        }

        match self.load_icon(&request.icon_key).await {
            Ok(image) => image,
            Err(LoaderError::UnknownIcon { icon_key }) => {
                debug!("No icon registered for {}, using placeholder", icon_key);
                self.placeholder(request)
            }
            Err(e) => {
                warn!(icon_key = %request.icon_key, error = %e, "Icon unavailable, using placeholder");
                self.placeholder(request)
            }
        }
    }
}
