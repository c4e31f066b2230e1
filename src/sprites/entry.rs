//! Registered sprite record

use super::key::CompositeRequest;

/// One composite currently registered in the atlas
#[derive(Debug, Clone, PartialEq)]
pub struct SpriteEntry {
    /// Cache identity, derived from the request
    pub id: String,
    /// Name the raster is registered under in the atlas (same as `id`)
    pub registration_key: String,
    /// Clock reading at registration
    pub created_at: u64,
    /// Clock reading at registration or the latest hit (for LRU eviction)
    pub last_used_at: u64,
    pub width: u32,
    pub height: u32,
    /// Attributes the composite was built from
    pub request: CompositeRequest,
}

impl SpriteEntry {
    pub fn new(id: String, request: CompositeRequest, width: u32, height: u32, now: u64) -> Self {
        Self {
            registration_key: id.clone(),
            id,
            created_at: now,
            last_used_at: now,
            width,
            height,
            request,
        }
    }

    /// Record a use; time never moves backwards for an entry
    pub fn touch(&mut self, now: u64) {
        self.last_used_at = self.last_used_at.max(now);
    }
}
