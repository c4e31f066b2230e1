//! In-memory record of every registered composite

use std::collections::{HashMap, HashSet};

use super::entry::SpriteEntry;

/// Sprite store keyed by identifier
#[derive(Debug, Default)]
pub struct SpriteStore {
    entries: HashMap<String, SpriteEntry>,
}

impl SpriteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&SpriteEntry> {
        self.entries.get(id)
    }

    /// Refresh `last_used_at` and return the updated entry
    pub fn touch(&mut self, id: &str, now: u64) -> Option<&SpriteEntry> {
        let entry = self.entries.get_mut(id)?;
        entry.touch(now);
        Some(entry)
    }

    /// Insert or replace; returns the previous entry under the same id
    pub fn insert(&mut self, entry: SpriteEntry) -> Option<SpriteEntry> {
        self.entries.insert(entry.id.clone(), entry)
    }

    pub fn remove(&mut self, id: &str) -> Option<SpriteEntry> {
        self.entries.remove(id)
    }

    /// Drain every entry
    pub fn drain(&mut self) -> Vec<SpriteEntry> {
        self.entries.drain().map(|(_, entry)| entry).collect()
    }

    /// Entries not in `keep`, oldest first, ties broken by identifier
    pub fn eviction_candidates(&self, keep: &HashSet<String>) -> Vec<&SpriteEntry> {
        let mut candidates: Vec<&SpriteEntry> = self
            .entries
            .values()
            .filter(|entry| !keep.contains(&entry.id))
            .collect();
        candidates.sort_by(|a, b| {
            a.last_used_at
                .cmp(&b.last_used_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sprites::key::{CompositeRequest, SpriteVariant};

    fn entry(id: &str, at: u64) -> SpriteEntry {
        SpriteEntry::new(
            id.to_string(),
            CompositeRequest::new(SpriteVariant::Plain, id, "icon"),
            150,
            40,
            at,
        )
    }

    #[test]
    fn test_insert_touch_remove() {
        let mut store = SpriteStore::new();
        assert!(store.insert(entry("a", 1)).is_none());
        assert!(store.insert(entry("a", 2)).is_some());
        assert_eq!(store.len(), 1);

        let touched = store.touch("a", 9).unwrap();
        assert_eq!(touched.last_used_at, 9);
        assert!(store.touch("missing", 9).is_none());

        assert!(store.remove("a").is_some());
        assert!(store.is_empty());
    }

    #[test]
    fn test_eviction_candidates_order_and_keep() {
        let mut store = SpriteStore::new();
        store.insert(entry("c", 5));
        store.insert(entry("b", 5));
        store.insert(entry("a", 9));
        store.insert(entry("d", 1));

        let keep: HashSet<String> = ["d".to_string()].into_iter().collect();
        let order: Vec<&str> = store
            .eviction_candidates(&keep)
            .into_iter()
            .map(|e| e.id.as_str())
            .collect();
        assert_eq!(order, vec!["b", "c", "a"]);
    }
}
