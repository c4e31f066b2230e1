//! Centralized error handling for the marker sprite cache
//!
//! # Error Categories
//!
//! - **Composite Errors**: missing background or a fatal drawing step
//! - **Atlas Errors**: invalid raster dimensions, registration and removal failures
//! - **Loader Errors**: icon/thumbnail fetches; these degrade to placeholders
//! - **Sprite Errors**: what a cache caller sees, shared by all single-flight waiters
//!
//! # Usage
//!
//! ```rust
//! use marker_sprites::errors::{SpriteError, SpriteResult};
//!
//! fn example_function() -> SpriteResult<String> {
//!     Err(SpriteError::invalid_request("label text is empty"))
//! }
//! ```

pub mod types;

pub use types::*;

/// Convenience type alias for Results using SpriteError
pub type SpriteResult<T> = Result<T, SpriteError>;

/// Convenience type alias for compositing Results
pub type CompositeResult<T> = Result<T, CompositeError>;

/// Convenience type alias for atlas Results
pub type AtlasResult<T> = Result<T, AtlasError>;

/// Convenience type alias for loader Results
pub type LoaderResult<T> = Result<T, LoaderError>;
