//! Registry of sprites currently being built
//!
//! Each in-flight build is a spawned task whose outcome is exposed as a
//! [`Shared`] future, so any number of callers can attach to it and all of
//! them observe the same result. Entries carry a ticket so that a task which
//! outlived a [`InFlightRegistry::clear`] cannot remove a newer task's slot.

use futures::future::{BoxFuture, Shared};
use std::collections::HashMap;

/// Future every waiter on one build polls
pub type SharedOutcome<T> = Shared<BoxFuture<'static, T>>;

struct InFlight<T: Clone> {
    ticket: u64,
    outcome: SharedOutcome<T>,
}

pub struct InFlightRegistry<T: Clone> {
    next_ticket: u64,
    tasks: HashMap<String, InFlight<T>>,
}

impl<T: Clone> Default for InFlightRegistry<T> {
    fn default() -> Self {
        Self {
            next_ticket: 0,
            tasks: HashMap::new(),
        }
    }
}

impl<T: Clone> InFlightRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.tasks.contains_key(id)
    }

    /// Handle to attach to an existing build
    pub fn get(&self, id: &str) -> Option<SharedOutcome<T>> {
        self.tasks.get(id).map(|task| task.outcome.clone())
    }

    /// Reserve a ticket for a build that is about to be started
    pub fn next_ticket(&mut self) -> u64 {
        self.next_ticket += 1;
        self.next_ticket
    }

    /// Record a build under `id`, replacing any previous slot
    pub fn insert(&mut self, id: String, ticket: u64, outcome: SharedOutcome<T>) {
        self.tasks.insert(id, InFlight { ticket, outcome });
    }

    /// Remove the slot for `id` if it still belongs to `ticket`
    pub fn settle(&mut self, id: &str, ticket: u64) -> bool {
        match self.tasks.get(id) {
            Some(task) if task.ticket == ticket => {
                self.tasks.remove(id);
                true
            }
            _ => false,
        }
    }

    /// Forget every build; returns how many were dropped
    pub fn clear(&mut self) -> usize {
        let count = self.tasks.len();
        self.tasks.clear();
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;

    fn ready(value: u32) -> SharedOutcome<u32> {
        async move { value }.boxed().shared()
    }

    #[tokio::test]
    async fn test_attached_waiters_see_same_outcome() {
        let mut registry = InFlightRegistry::new();
        let ticket = registry.next_ticket();
        registry.insert("a".to_string(), ticket, ready(7));

        let first = registry.get("a").unwrap();
        let second = registry.get("a").unwrap();
        assert_eq!(first.await, 7);
        assert_eq!(second.await, 7);
    }

    #[test]
    fn test_settle_requires_matching_ticket() {
        let mut registry = InFlightRegistry::new();
        let old = registry.next_ticket();
        registry.insert("a".to_string(), old, ready(1));
        registry.clear();

        let new = registry.next_ticket();
        assert_ne!(old, new);
        registry.insert("a".to_string(), new, ready(2));

        assert!(!registry.settle("a", old));
        assert!(registry.contains("a"));
        assert!(registry.settle("a", new));
        assert!(registry.is_empty());
        assert!(!registry.settle("a", new));
    }

    #[test]
    fn test_clear_reports_dropped_builds() {
        let mut registry = InFlightRegistry::new();
        for id in ["a", "b", "c"] {
            let ticket = registry.next_ticket();
            registry.insert(id.to_string(), ticket, ready(0));
        }
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.clear(), 3);
        assert!(registry.get("a").is_none());
    }
}
