pub mod assets;
pub mod atlas;
pub mod batch;
pub mod compositing;
pub mod config;
pub mod errors;
pub mod sprites;
pub mod utils;

pub use batch::{composite_for_features, launch_for_features, BatchSummary, Feature, FeatureCollection};
pub use config::Config;
pub use errors::{SpriteError, SpriteResult};
pub use sprites::{CompositeRequest, EnsuredSprite, SpriteCache, SpriteCacheStats, SpriteVariant};
