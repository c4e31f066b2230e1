//! Host renderer image atlas
//!
//! The atlas is owned by the map renderer: a bounded set of named images that
//! map layers can reference as icons. The cache only needs three operations
//! from it, captured by [`ImageAtlas`].

pub mod memory;
pub mod sync;

use image::RgbaImage;
use std::sync::Arc;

use crate::errors::AtlasResult;

pub use memory::InMemoryAtlas;
pub use sync::{register, remove_best_effort};

/// Registration options passed through to the atlas
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageOptions {
    pub pixel_ratio: f32,
}

impl Default for ImageOptions {
    fn default() -> Self {
        Self { pixel_ratio: 1.0 }
    }
}

/// Transportable pixel buffer in the layout the atlas accepts (RGBA8, row-major)
#[derive(Debug, Clone, PartialEq)]
pub struct AtlasImage {
    pub width: u32,
    pub height: u32,
    pub data: Arc<[u8]>,
}

impl AtlasImage {
    /// Convert a composited raster into an atlas upload
    pub fn from_raster(raster: &RgbaImage) -> Self {
        Self {
            width: raster.width(),
            height: raster.height(),
            data: Arc::from(raster.as_raw().as_slice()),
        }
    }

    /// Back to a raster, for inspection or export
    pub fn to_raster(&self) -> Option<RgbaImage> {
        RgbaImage::from_raw(self.width, self.height, self.data.to_vec())
    }
}

/// Named image collection of the host renderer
///
/// Implementations are shared between tasks and use interior mutability.
pub trait ImageAtlas: Send + Sync {
    fn has_image(&self, key: &str) -> bool;

    fn add_image(&self, key: &str, image: AtlasImage, options: ImageOptions) -> AtlasResult<()>;

    fn remove_image(&self, key: &str) -> AtlasResult<()>;
}

impl<T: ImageAtlas + ?Sized> ImageAtlas for Arc<T> {
    fn has_image(&self, key: &str) -> bool {
        (**self).has_image(key)
    }

    fn add_image(&self, key: &str, image: AtlasImage, options: ImageOptions) -> AtlasResult<()> {
        (**self).add_image(key, image, options)
    }

    fn remove_image(&self, key: &str) -> AtlasResult<()> {
        (**self).remove_image(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_atlas_image_conversion_keeps_pixels() {
        let raster = RgbaImage::from_pixel(3, 2, Rgba([1, 2, 3, 4]));
        let upload = AtlasImage::from_raster(&raster);
        assert_eq!(upload.width, 3);
        assert_eq!(upload.height, 2);
        assert_eq!(upload.data.len(), 3 * 2 * 4);
        assert_eq!(upload.to_raster().unwrap(), raster);
    }
}
