//! Slot budget enforcement with least-recently-used eviction

use std::collections::HashSet;
use tracing::debug;

use super::store::SpriteStore;
use crate::atlas::{remove_best_effort, ImageAtlas};

/// Keeps the number of non-exempt composites under a fixed ceiling
#[derive(Debug, Clone, Copy)]
pub struct BudgetEnforcer {
    capacity: usize,
}

impl BudgetEnforcer {
    pub fn new(capacity: usize) -> Self {
        Self { capacity }
    }

    /// `capacity - reserve`, floored at zero
    pub fn effective_limit(&self, reserve: usize) -> usize {
        self.capacity.saturating_sub(reserve)
    }

    /// Evict the oldest entries not in `keep` until at most
    /// `capacity - reserve` of them remain.
    ///
    /// Each victim is removed from the atlas (errors swallowed) before it is
    /// removed from the store. Returns the evicted identifiers, oldest first.
    pub fn enforce(
        &self,
        store: &mut SpriteStore,
        atlas: &dyn ImageAtlas,
        keep: &HashSet<String>,
        reserve: usize,
    ) -> Vec<String> {
        let limit = self.effective_limit(reserve);
        let victims: Vec<String> = {
            let candidates = store.eviction_candidates(keep);
            if candidates.len() <= limit {
                return Vec::new();
            }
            let excess = candidates.len() - limit;
            candidates
                .into_iter()
                .take(excess)
                .map(|entry| entry.id.clone())
                .collect()
        };

        for id in &victims {
            let registration_key = store
                .get(id)
                .map(|entry| entry.registration_key.clone())
                .unwrap_or_else(|| id.clone());
            remove_best_effort(atlas, &registration_key);
            store.remove(id);
            debug!(sprite_id = %id, "Evicted least recently used sprite");
        }

        victims
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atlas::{AtlasImage, InMemoryAtlas};
    use crate::sprites::entry::SpriteEntry;
    use crate::sprites::key::{CompositeRequest, SpriteVariant};
    use image::{Rgba, RgbaImage};

    fn populate(count: usize, atlas: &InMemoryAtlas) -> SpriteStore {
        let mut store = SpriteStore::new();
        let raster = RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 255]));
        for i in 0..count {
            let id = format!("sprite-{:04}", i);
            atlas.insert_foreign(&id, AtlasImage::from_raster(&raster));
            store.insert(SpriteEntry::new(
                id.clone(),
                CompositeRequest::new(SpriteVariant::Plain, id.as_str(), "icon"),
                2,
                2,
                i as u64,
            ));
        }
        store
    }

    #[test]
    fn test_effective_limit_saturates() {
        let enforcer = BudgetEnforcer::new(3);
        assert_eq!(enforcer.effective_limit(1), 2);
        assert_eq!(enforcer.effective_limit(5), 0);
    }

    #[test]
    fn test_under_budget_is_noop() {
        let atlas = InMemoryAtlas::new(100);
        let mut store = populate(5, &atlas);
        let evicted = BudgetEnforcer::new(10).enforce(&mut store, &atlas, &HashSet::new(), 1);
        assert!(evicted.is_empty());
        assert_eq!(store.len(), 5);
    }

    #[test]
    fn test_evicts_oldest_first_from_atlas_and_store() {
        let atlas = InMemoryAtlas::new(100);
        let mut store = populate(6, &atlas);
        let evicted = BudgetEnforcer::new(4).enforce(&mut store, &atlas, &HashSet::new(), 0);
        assert_eq!(evicted, vec!["sprite-0000", "sprite-0001"]);
        assert_eq!(store.len(), 4);
        assert!(!atlas.has_image("sprite-0000"));
        assert!(!atlas.has_image("sprite-0001"));
        assert!(atlas.has_image("sprite-0002"));
    }

    #[test]
    fn test_keep_set_survives_despite_age() {
        // 901 evictable entries plus the exempt oldest one
        let atlas = InMemoryAtlas::new(2000);
        let mut store = populate(902, &atlas);
        let keep: HashSet<String> = ["sprite-0000".to_string()].into_iter().collect();

        let evicted = BudgetEnforcer::new(900).enforce(&mut store, &atlas, &keep, 0);

        assert_eq!(evicted, vec!["sprite-0001"]);
        assert!(store.contains("sprite-0000"));
        assert_eq!(store.len(), 901);
    }

    #[test]
    fn test_removal_errors_do_not_block_store_eviction() {
        let atlas = InMemoryAtlas::new(100);
        let mut store = populate(3, &atlas);
        atlas.fail_removals(true);
        let evicted = BudgetEnforcer::new(1).enforce(&mut store, &atlas, &HashSet::new(), 0);
        assert_eq!(evicted.len(), 2);
        assert_eq!(store.len(), 1);
    }
}
