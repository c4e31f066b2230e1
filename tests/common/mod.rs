//! Test doubles shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use image::{Rgba, RgbaImage};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

use marker_sprites::atlas::InMemoryAtlas;
use marker_sprites::compositing::SpriteRenderer;
use marker_sprites::config::SpriteConfig;
use marker_sprites::errors::{CompositeError, SpriteResult};
use marker_sprites::sprites::{CompositeRequest, SpriteCache, SpriteVariant};
use marker_sprites::utils::ManualClock;

type FailWhen = Box<dyn Fn(&CompositeRequest) -> bool + Send + Sync>;

/// Renderer that counts invocations and can be held open or made to fail
pub struct CountingRenderer {
    calls: AtomicUsize,
    gate: Option<Arc<Notify>>,
    fail_when: Option<FailWhen>,
}

impl CountingRenderer {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            gate: None,
            fail_when: None,
        }
    }

    /// Every render waits for one `notify_one` on `gate` before finishing
    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn failing_when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CompositeRequest) -> bool + Send + Sync + 'static,
    {
        self.fail_when = Some(Box::new(predicate));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpriteRenderer for CountingRenderer {
    async fn render(&self, request: &CompositeRequest) -> SpriteResult<RgbaImage> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.gate {
            Some(gate) => gate.notified().await,
            None => tokio::task::yield_now().await,
        }

        if self.fail_when.as_ref().is_some_and(|fail| fail(request)) {
            return Err(CompositeError::draw("background", "injected failure").into());
        }
        let (width, height) = if request.variant.is_emphasized() {
            (225, 60)
        } else {
            (150, 40)
        };
        Ok(RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 255])))
    }
}

pub struct Harness {
    pub cache: SpriteCache,
    pub atlas: Arc<InMemoryAtlas>,
    pub renderer: Arc<CountingRenderer>,
    pub clock: Arc<ManualClock>,
}

pub fn harness(renderer: CountingRenderer, config: SpriteConfig) -> Harness {
    let atlas = Arc::new(InMemoryAtlas::new(2000));
    let renderer = Arc::new(renderer);
    let clock = Arc::new(ManualClock::new(1_000));
    let cache = SpriteCache::with_clock(atlas.clone(), renderer.clone(), clock.clone(), config);
    Harness {
        cache,
        atlas,
        renderer,
        clock,
    }
}

pub fn default_harness() -> Harness {
    harness(CountingRenderer::new(), SpriteConfig::default())
}

pub fn plain(label: &str, icon: &str) -> CompositeRequest {
    CompositeRequest::new(SpriteVariant::Plain, label, icon)
}

/// Let spawned tasks run until `done` holds
pub async fn settle_until<F: Fn() -> bool>(done: F) {
    for _ in 0..1_000 {
        if done() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition not reached");
}
