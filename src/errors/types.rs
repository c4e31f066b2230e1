//! Error type definitions for the marker sprite cache
//!
//! This module defines all error types used throughout the crate, providing a
//! hierarchical error system: compositing, atlas and loader errors roll up into
//! [`SpriteError`], which is what callers of the cache see.

use thiserror::Error;

/// Top-level sprite cache error type
///
/// Every variant is `Clone` so that a single outcome can be handed to every
/// caller attached to the same in-flight task.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SpriteError {
    /// Compositing failures (fatal to one request)
    #[error("Composite error: {0}")]
    Composite(#[from] CompositeError),

    /// Atlas registration failures (fatal to one request, retried once)
    #[error("Atlas error: {0}")]
    Atlas(#[from] AtlasError),

    /// Request is missing something the cache needs
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    /// The cache was cleared while this sprite was being built
    #[error("Sprite {id} was cleared while in flight")]
    ClearedInFlight { id: String },

    /// The background task building the sprite panicked or was aborted
    #[error("Sprite task failed: {id} - {message}")]
    TaskFailed { id: String, message: String },
}

/// Compositing engine errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompositeError {
    /// No background raster available for the variant
    #[error("Missing background for variant {variant}")]
    MissingBackground { variant: String },

    /// A drawing step that the output cannot do without failed
    #[error("Draw failure during {stage}: {message}")]
    DrawFailure { stage: String, message: String },
}

/// External atlas errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AtlasError {
    /// Raster has a zero dimension
    #[error("Invalid dimensions for {key}: {width}x{height}")]
    InvalidDimensions { key: String, width: u32, height: u32 },

    /// The atlas refused the image
    #[error("Registration failed for {key}: {message}")]
    RegistrationError { key: String, message: String },

    /// The atlas failed to remove an image
    #[error("Removal failed for {key}: {message}")]
    RemovalError { key: String, message: String },
}

/// Icon, thumbnail and background loading errors
///
/// These never fail a sprite request on their own; the icon resolver degrades
/// to a placeholder instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoaderError {
    /// Transport-level failure
    #[error("Fetch failed: {url} - {message}")]
    Fetch { url: String, message: String },

    /// Bytes arrived but were not a decodable image
    #[error("Decode failed: {url} - {message}")]
    Decode { url: String, message: String },

    /// The loader gave up waiting
    #[error("Load timed out: {url}")]
    Timeout { url: String },

    /// Nothing is registered under the icon key
    #[error("No icon registered for key {icon_key}")]
    UnknownIcon { icon_key: String },
}

/// Convenience methods for creating common error types
impl SpriteError {
    /// Create an invalid request error
    pub fn invalid_request<S: Into<String>>(message: S) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Create a task failure error
    pub fn task_failed<I: Into<String>, M: Into<String>>(id: I, message: M) -> Self {
        Self::TaskFailed {
            id: id.into(),
            message: message.into(),
        }
    }
}

impl CompositeError {
    /// Create a draw failure for a named stage
    pub fn draw<S: Into<String>, M: Into<String>>(stage: S, message: M) -> Self {
        Self::DrawFailure {
            stage: stage.into(),
            message: message.into(),
        }
    }
}

impl AtlasError {
    /// Create a registration error
    pub fn registration<K: Into<String>, M: Into<String>>(key: K, message: M) -> Self {
        Self::RegistrationError {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Create a removal error
    pub fn removal<K: Into<String>, M: Into<String>>(key: K, message: M) -> Self {
        Self::RemovalError {
            key: key.into(),
            message: message.into(),
        }
    }
}

impl LoaderError {
    pub fn fetch<U: Into<String>, M: Into<String>>(url: U, message: M) -> Self {
        Self::Fetch {
            url: url.into(),
            message: message.into(),
        }
    }

    pub fn decode<U: Into<String>, M: Into<String>>(url: U, message: M) -> Self {
        Self::Decode {
            url: url.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_into_sprite_error() {
        let err: SpriteError = CompositeError::MissingBackground {
            variant: "plain".to_string(),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "Composite error: Missing background for variant plain"
        );

        let err: SpriteError = AtlasError::registration("sprite-a", "atlas full").into();
        assert!(matches!(err, SpriteError::Atlas(AtlasError::RegistrationError { .. })));
        assert!(err.to_string().contains("atlas full"));
    }

    #[test]
    fn test_sprite_error_is_cloneable_for_shared_outcomes() {
        let err = SpriteError::task_failed("sprite-a", "panicked");
        let copy = err.clone();
        assert_eq!(err, copy);
    }
}
