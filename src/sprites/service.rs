//! Sprite cache service with single-flight builds and slot budgeting

use futures::FutureExt;
use image::RgbaImage;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

use super::budget::BudgetEnforcer;
use super::entry::SpriteEntry;
use super::key::{CompositeRequest, SpriteKeyDeriver};
use super::single_flight::{InFlightRegistry, SharedOutcome};
use super::store::SpriteStore;
use crate::atlas::{register, remove_best_effort, AtlasImage, ImageAtlas, ImageOptions};
use crate::compositing::SpriteRenderer;
use crate::config::SpriteConfig;
use crate::errors::{SpriteError, SpriteResult};
use crate::utils::clock::{Clock, MonotonicClock};

/// Result of a successful `ensure`
#[derive(Debug, Clone, PartialEq)]
pub struct EnsuredSprite {
    /// Identifier the composite is registered under in the atlas
    pub id: String,
    pub meta: SpriteEntry,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SpriteCacheStats {
    pub entries: usize,
    pub in_flight: usize,
    pub hits: u64,
    pub misses: u64,
    pub created: u64,
    pub evictions: u64,
    pub failures: u64,
}

type BuildOutcome = SpriteResult<EnsuredSprite>;

struct CacheState {
    store: SpriteStore,
    in_flight: InFlightRegistry<BuildOutcome>,
    /// Bumped by every clear; builds started under an older epoch are discarded
    epoch: u64,
}

struct CacheInner {
    atlas: Arc<dyn ImageAtlas>,
    renderer: Arc<dyn SpriteRenderer>,
    clock: Arc<dyn Clock>,
    keys: SpriteKeyDeriver,
    budget: BudgetEnforcer,
    config: SpriteConfig,
    state: Mutex<CacheState>,
    hits: AtomicU64,
    misses: AtomicU64,
    created: AtomicU64,
    evictions: AtomicU64,
    failures: AtomicU64,
}

/// Marker label sprite cache
///
/// Owns the sprite store and in-flight registry for one atlas. Cloning is
/// cheap and every clone shares the same state. Misses are built on spawned
/// Tokio tasks, so `ensure` must be called from within a runtime.
#[derive(Clone)]
pub struct SpriteCache {
    inner: Arc<CacheInner>,
}

impl SpriteCache {
    pub fn new(
        atlas: Arc<dyn ImageAtlas>,
        renderer: Arc<dyn SpriteRenderer>,
        config: SpriteConfig,
    ) -> Self {
        Self::with_clock(atlas, renderer, Arc::new(MonotonicClock::new()), config)
    }

    pub fn with_clock(
        atlas: Arc<dyn ImageAtlas>,
        renderer: Arc<dyn SpriteRenderer>,
        clock: Arc<dyn Clock>,
        config: SpriteConfig,
    ) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                atlas,
                renderer,
                clock,
                keys: SpriteKeyDeriver::new(config.id_prefix.clone()),
                budget: BudgetEnforcer::new(config.capacity),
                config,
                state: Mutex::new(CacheState {
                    store: SpriteStore::new(),
                    in_flight: InFlightRegistry::new(),
                    epoch: 0,
                }),
                hits: AtomicU64::new(0),
                misses: AtomicU64::new(0),
                created: AtomicU64::new(0),
                evictions: AtomicU64::new(0),
                failures: AtomicU64::new(0),
            }),
        }
    }

    pub fn config(&self) -> &SpriteConfig {
        &self.inner.config
    }

    /// Identifier `request` would be registered under
    pub fn derive_id(&self, request: &CompositeRequest) -> String {
        self.inner.keys.derive(request)
    }

    /// Whether composites should exist at this zoom level
    pub fn is_zoom_eligible(&self, zoom: f64) -> bool {
        zoom.is_finite() && zoom >= self.inner.config.min_zoom
    }

    /// Get or build the composite for `request`
    pub async fn ensure(&self, request: CompositeRequest) -> SpriteResult<EnsuredSprite> {
        self.ensure_protected(request, &[]).await
    }

    /// Like [`ensure`](Self::ensure), but budget enforcement for this build
    /// never evicts any identifier in `protected`
    pub async fn ensure_protected(
        &self,
        request: CompositeRequest,
        protected: &[String],
    ) -> SpriteResult<EnsuredSprite> {
        validate_request(&request)?;
        let id = self.inner.keys.derive(&request);

        let outcome = {
            let mut state = self.inner.lock_state();
            if let Some(hit) = self.inner.lookup_hit(&mut state, &id) {
                return Ok(hit);
            }
            match state.in_flight.get(&id) {
                Some(existing) => {
                    debug!(sprite_id = %id, "Attaching to in-flight sprite build");
                    existing
                }
                None => self.start_build(&mut state, id, request, protected),
            }
        };

        outcome.await
    }

    fn start_build(
        &self,
        state: &mut CacheState,
        id: String,
        request: CompositeRequest,
        protected: &[String],
    ) -> SharedOutcome<BuildOutcome> {
        self.inner.misses.fetch_add(1, Ordering::Relaxed);
        debug!(sprite_id = %id, "Sprite cache miss, compositing");

        let ticket = state.in_flight.next_ticket();
        let epoch = state.epoch;
        let mut keep: HashSet<String> = protected.iter().cloned().collect();
        keep.insert(id.clone());

        let inner = Arc::clone(&self.inner);
        let task_id = id.clone();
        let handle =
            tokio::spawn(async move { inner.build(task_id, request, keep, epoch, ticket).await });

        let join_id = id.clone();
        let outcome = async move {
            match handle.await {
                Ok(result) => result,
                Err(e) => Err(SpriteError::task_failed(join_id, e.to_string())),
            }
        }
        .boxed()
        .shared();

        state.in_flight.insert(id, ticket, outcome.clone());
        outcome
    }

    /// Remove every composite from the atlas and forget all state
    ///
    /// Builds still running finish without touching the store or the atlas.
    pub fn clear_all(&self) -> usize {
        let mut state = self.inner.lock_state();
        let entries = state.store.drain();
        for entry in &entries {
            remove_best_effort(self.inner.atlas.as_ref(), &entry.registration_key);
        }
        let abandoned = state.in_flight.clear();
        state.epoch += 1;

        info!(
            "Cleared {} marker sprites ({} in-flight builds abandoned)",
            entries.len(),
            abandoned
        );
        entries.len()
    }

    /// Drop every composite once the map zooms out past the threshold
    pub fn on_zoom_changed(&self, zoom: f64) -> bool {
        if self.is_zoom_eligible(zoom) {
            return false;
        }
        let has_state = {
            let state = self.inner.lock_state();
            !state.store.is_empty() || !state.in_flight.is_empty()
        };
        if has_state {
            debug!("Zoom {} below {}, clearing sprites", zoom, self.inner.config.min_zoom);
            self.clear_all();
        }
        has_state
    }

    pub fn get(&self, id: &str) -> Option<SpriteEntry> {
        self.inner.lock_state().store.get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.inner.lock_state().store.contains(id)
    }

    pub fn len(&self) -> usize {
        self.inner.lock_state().store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> SpriteCacheStats {
        let state = self.inner.lock_state();
        SpriteCacheStats {
            entries: state.store.len(),
            in_flight: state.in_flight.len(),
            hits: self.inner.hits.load(Ordering::Relaxed),
            misses: self.inner.misses.load(Ordering::Relaxed),
            created: self.inner.created.load(Ordering::Relaxed),
            evictions: self.inner.evictions.load(Ordering::Relaxed),
            failures: self.inner.failures.load(Ordering::Relaxed),
        }
    }
}

impl CacheInner {
    fn lock_state(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store entry that is still present in the atlas, refreshed
    fn lookup_hit(&self, state: &mut CacheState, id: &str) -> Option<EnsuredSprite> {
        let registration_key = state.store.get(id)?.registration_key.clone();
        if !self.atlas.has_image(&registration_key) {
            debug!(sprite_id = %id, "Stored sprite missing from atlas, rebuilding");
            return None;
        }
        let meta = state.store.touch(id, self.clock.now_millis())?.clone();
        self.hits.fetch_add(1, Ordering::Relaxed);
        debug!(sprite_id = %id, "Sprite cache hit");
        Some(EnsuredSprite {
            id: id.to_string(),
            meta,
        })
    }

    async fn build(
        self: Arc<Self>,
        id: String,
        request: CompositeRequest,
        keep: HashSet<String>,
        epoch: u64,
        ticket: u64,
    ) -> BuildOutcome {
        let _settle = SettleGuard {
            inner: Arc::clone(&self),
            id: id.clone(),
            ticket,
        };
        let rendered = self.renderer.render(&request).await;

        let mut state = self.lock_state();
        if state.epoch != epoch {
            debug!(sprite_id = %id, "Discarding sprite built before a clear");
            return Err(SpriteError::ClearedInFlight { id });
        }

        let result =
            rendered.and_then(|raster| self.install(&mut state, &id, request, &raster, &keep));
        state.in_flight.settle(&id, ticket);

        match &result {
            Ok(_) => {
                self.created.fetch_add(1, Ordering::Relaxed);
                debug!(sprite_id = %id, "Sprite registered");
            }
            Err(e) => {
                state.store.remove(&id);
                self.failures.fetch_add(1, Ordering::Relaxed);
                warn!(sprite_id = %id, error = %e, "Sprite build failed");
            }
        }
        result
    }

    /// Make room, register the raster and record it; runs under the state lock
    fn install(
        &self,
        state: &mut CacheState,
        id: &str,
        request: CompositeRequest,
        raster: &RgbaImage,
        keep: &HashSet<String>,
    ) -> SpriteResult<EnsuredSprite> {
        let evicted = self.budget.enforce(
            &mut state.store,
            self.atlas.as_ref(),
            keep,
            self.config.reserve,
        );
        if !evicted.is_empty() {
            self.evictions
                .fetch_add(evicted.len() as u64, Ordering::Relaxed);
            debug!("Evicted {} sprites to make room for {}", evicted.len(), id);
        }

        register(
            self.atlas.as_ref(),
            id,
            AtlasImage::from_raster(raster),
            ImageOptions::default(),
        )?;

        let meta = SpriteEntry::new(
            id.to_string(),
            request,
            raster.width(),
            raster.height(),
            self.clock.now_millis(),
        );
        state.store.insert(meta.clone());
        Ok(EnsuredSprite {
            id: id.to_string(),
            meta,
        })
    }
}

/// Frees the in-flight slot even if the build task unwinds
struct SettleGuard {
    inner: Arc<CacheInner>,
    id: String,
    ticket: u64,
}

impl Drop for SettleGuard {
    fn drop(&mut self) {
        self.inner.lock_state().in_flight.settle(&self.id, self.ticket);
    }
}

fn validate_request(request: &CompositeRequest) -> SpriteResult<()> {
    if request.label_text.trim().is_empty() {
        return Err(SpriteError::invalid_request("label text is empty"));
    }
    if request.icon_key.is_empty() {
        return Err(SpriteError::invalid_request("icon key is empty"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atlas::InMemoryAtlas;
    use crate::sprites::key::SpriteVariant;
    use crate::utils::clock::ManualClock;
    use async_trait::async_trait;
    use image::Rgba;
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct FlatRenderer {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SpriteRenderer for FlatRenderer {
        async fn render(&self, request: &CompositeRequest) -> SpriteResult<RgbaImage> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let (w, h) = if request.variant.is_emphasized() {
                (225, 60)
            } else {
                (150, 40)
            };
            Ok(RgbaImage::from_pixel(w, h, Rgba([0, 0, 0, 255])))
        }
    }

    fn cache_with(
        capacity: usize,
    ) -> (SpriteCache, Arc<InMemoryAtlas>, Arc<FlatRenderer>, Arc<ManualClock>) {
        let atlas = Arc::new(InMemoryAtlas::new(1000));
        let renderer = Arc::new(FlatRenderer::default());
        let clock = Arc::new(ManualClock::new(100));
        let config = SpriteConfig {
            capacity,
            ..Default::default()
        };
        let cache = SpriteCache::with_clock(atlas.clone(), renderer.clone(), clock.clone(), config);
        (cache, atlas, renderer, clock)
    }

    fn request(label: &str) -> CompositeRequest {
        CompositeRequest::new(SpriteVariant::Plain, label, "food")
    }

    #[tokio::test]
    async fn test_miss_then_hit() {
        let (cache, atlas, renderer, clock) = cache_with(900);

        let first = cache.ensure(request("Farmers Market")).await.unwrap();
        assert_eq!(first.meta.created_at, 100);
        assert!(atlas.has_image(&first.id));
        assert_eq!((first.meta.width, first.meta.height), (150, 40));

        clock.advance(50);
        let second = cache.ensure(request("Farmers Market")).await.unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(second.meta.last_used_at, 150);
        assert_eq!(renderer.calls.load(Ordering::SeqCst), 1);

        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses, stats.created), (1, 1, 1));
        assert_eq!(stats.in_flight, 0);
    }

    #[tokio::test]
    async fn test_missing_atlas_image_forces_rebuild() {
        let (cache, atlas, renderer, _clock) = cache_with(900);
        let sprite = cache.ensure(request("Farmers Market")).await.unwrap();

        atlas.remove_image(&sprite.id).unwrap();
        let rebuilt = cache.ensure(request("Farmers Market")).await.unwrap();

        assert_eq!(rebuilt.id, sprite.id);
        assert_eq!(renderer.calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_rejects_empty_label_and_icon() {
        let (cache, _atlas, renderer, _clock) = cache_with(900);
        assert!(matches!(
            cache.ensure(request("   ")).await,
            Err(SpriteError::InvalidRequest { .. })
        ));
        assert!(matches!(
            cache
                .ensure(CompositeRequest::new(SpriteVariant::Plain, "A", ""))
                .await,
            Err(SpriteError::InvalidRequest { .. })
        ));
        assert_eq!(renderer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_budget_counts_evictions() {
        let (cache, atlas, _renderer, clock) = cache_with(3);
        for label in ["a", "b", "c", "d"] {
            clock.advance(1);
            cache.ensure(request(label)).await.unwrap();
        }
        // capacity 3, reserve 1: two others may remain next to the new one
        assert_eq!(cache.len(), 3);
        assert_eq!(atlas.len(), 3);
        assert_eq!(cache.stats().evictions, 1);
        assert!(!cache.contains(&cache.derive_id(&request("a"))));
    }

    #[tokio::test]
    async fn test_clear_all_empties_atlas_and_store() {
        let (cache, atlas, _renderer, _clock) = cache_with(900);
        cache.ensure(request("a")).await.unwrap();
        cache.ensure(request("b")).await.unwrap();

        assert_eq!(cache.clear_all(), 2);
        assert!(cache.is_empty());
        assert!(atlas.is_empty());
    }

    #[tokio::test]
    async fn test_zoom_out_clears_once() {
        let (cache, _atlas, _renderer, _clock) = cache_with(900);
        cache.ensure(request("a")).await.unwrap();

        assert!(!cache.on_zoom_changed(12.0));
        assert!(cache.on_zoom_changed(7.5));
        assert!(cache.is_empty());
        assert!(!cache.on_zoom_changed(6.0));
        assert!(!cache.is_zoom_eligible(f64::NAN));
    }
}
