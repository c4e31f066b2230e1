//! Backgrounds, icons and the loaders that fetch them

pub mod backgrounds;
pub mod icons;
pub mod loader;

pub use backgrounds::{BackgroundSet, BackgroundSupplier};
pub use icons::IconResolver;
pub use loader::{
    AssetLoader, FileAssetLoader, HttpAssetLoader, RoutingAssetLoader, StaticAssetLoader,
};
