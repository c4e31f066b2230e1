//! In-process atlas with the same constraints as the renderer's
//!
//! Adding under a name that is already taken fails, and the atlas holds a
//! bounded number of images. Failure injection hooks make the retrying
//! registration paths observable.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use super::{AtlasImage, ImageAtlas, ImageOptions};
use crate::errors::{AtlasError, AtlasResult};

#[derive(Debug)]
pub struct InMemoryAtlas {
    images: Mutex<HashMap<String, (AtlasImage, ImageOptions)>>,
    capacity: usize,
    add_calls: AtomicUsize,
    remove_calls: AtomicUsize,
    failing_adds: AtomicUsize,
    failing_removals: AtomicBool,
}

impl InMemoryAtlas {
    pub fn new(capacity: usize) -> Self {
        Self {
            images: Mutex::new(HashMap::new()),
            capacity,
            add_calls: AtomicUsize::new(0),
            remove_calls: AtomicUsize::new(0),
            failing_adds: AtomicUsize::new(0),
            failing_removals: AtomicBool::new(false),
        }
    }

    fn images(&self) -> std::sync::MutexGuard<'_, HashMap<String, (AtlasImage, ImageOptions)>> {
        self.images.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn len(&self) -> usize {
        self.images().len()
    }

    pub fn is_empty(&self) -> bool {
        self.images().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn image(&self, key: &str) -> Option<AtlasImage> {
        self.images().get(key).map(|(image, _)| image.clone())
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.images().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Register an image that does not belong to the sprite cache
    pub fn insert_foreign(&self, key: &str, image: AtlasImage) {
        self.images()
            .insert(key.to_string(), (image, ImageOptions::default()));
    }

    /// Make the next `count` calls to `add_image` fail
    pub fn fail_next_adds(&self, count: usize) {
        self.failing_adds.store(count, Ordering::SeqCst);
    }

    /// Make every `remove_image` call fail until switched off
    pub fn fail_removals(&self, enabled: bool) {
        self.failing_removals.store(enabled, Ordering::SeqCst);
    }

    pub fn add_calls(&self) -> usize {
        self.add_calls.load(Ordering::SeqCst)
    }

    pub fn remove_calls(&self) -> usize {
        self.remove_calls.load(Ordering::SeqCst)
    }
}

impl ImageAtlas for InMemoryAtlas {
    fn has_image(&self, key: &str) -> bool {
        self.images().contains_key(key)
    }

    fn add_image(&self, key: &str, image: AtlasImage, options: ImageOptions) -> AtlasResult<()> {
        self.add_calls.fetch_add(1, Ordering::SeqCst);

        let injected = self
            .failing_adds
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(AtlasError::registration(key, "injected failure"));
        }

        let mut images = self.images();
        if images.contains_key(key) {
            return Err(AtlasError::registration(
                key,
                "an image with this name already exists",
            ));
        }
        if images.len() >= self.capacity {
            return Err(AtlasError::registration(
                key,
                format!("atlas is full ({} images)", self.capacity),
            ));
        }
        images.insert(key.to_string(), (image, options));
        Ok(())
    }

    fn remove_image(&self, key: &str) -> AtlasResult<()> {
        self.remove_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_removals.load(Ordering::SeqCst) {
            return Err(AtlasError::removal(key, "injected failure"));
        }
        match self.images().remove(key) {
            Some(_) => Ok(()),
            None => Err(AtlasError::removal(key, "no such image")),
        }
    }
}
