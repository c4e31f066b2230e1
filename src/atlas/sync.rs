//! Atlas registration: remove, validate, add, retry once

use tracing::{debug, error, warn};

use super::{AtlasImage, ImageAtlas, ImageOptions};
use crate::errors::{AtlasError, AtlasResult};

/// Remove `key` if present, swallowing failures (the image may already be gone)
pub fn remove_best_effort(atlas: &dyn ImageAtlas, key: &str) -> bool {
    if !atlas.has_image(key) {
        return false;
    }
    match atlas.remove_image(key) {
        Ok(()) => true,
        Err(e) => {
            debug!(sprite_id = %key, error = %e, "Ignoring atlas removal failure");
            false
        }
    }
}

/// Register `image` under `key`
///
/// Any existing image under the key is removed first, dimensions are
/// validated, and a failed registration is retried exactly once after another
/// removal.
pub fn register(
    atlas: &dyn ImageAtlas,
    key: &str,
    image: AtlasImage,
    options: ImageOptions,
) -> AtlasResult<()> {
    remove_best_effort(atlas, key);

    if image.width == 0 || image.height == 0 {
        return Err(AtlasError::InvalidDimensions {
            key: key.to_string(),
            width: image.width,
            height: image.height,
        });
    }

    match atlas.add_image(key, image.clone(), options) {
        Ok(()) => Ok(()),
        Err(first) => {
            warn!(
                sprite_id = %key,
                error = %first,
                "Atlas registration failed, retrying after removal"
            );
            remove_best_effort(atlas, key);
            atlas.add_image(key, image, options).map_err(|second| {
                error!(sprite_id = %key, error = %second, "Atlas registration retry failed");
                match second {
                    AtlasError::RegistrationError { .. } => second,
                    other => AtlasError::registration(key, other.to_string()),
                }
            })
        }
    }
}
