//! Marker label sprite cache
//!
//! Composites are identified by a hash of everything that affects their
//! pixels, built at most once per identifier at a time, and kept under a slot
//! budget with least-recently-used eviction.

pub mod budget;
pub mod entry;
pub mod key;
pub mod service;
pub mod single_flight;
pub mod store;

pub use budget::BudgetEnforcer;
pub use entry::SpriteEntry;
pub use key::{
    derive_id, BackgroundBucket, CompositeRequest, SizeClass, SpriteKeyDeriver, SpriteVariant,
    VariantRole, VARIANT_EMPHASIZED, VARIANT_EMPHASIZED_MULTI, VARIANT_HOVER,
    VARIANT_HOVER_MULTI, VARIANT_PLAIN, VARIANT_PLAIN_MULTI,
};
pub use service::{EnsuredSprite, SpriteCache, SpriteCacheStats};
pub use single_flight::InFlightRegistry;
pub use store::SpriteStore;
