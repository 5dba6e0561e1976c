//! Prefetch cache: the set of paths already handed to the router.
//!
//! A path in the cache is never issued again by the scheduler that owns
//! it. The bounded variant keeps at most `capacity` entries and evicts in
//! insertion order (FIFO); re-adding an existing path does not refresh it.

use std::collections::{HashSet, VecDeque};

use tracing::debug;

use crate::route::NormalizedPath;

/// Capacity used by the bounded cache unless configured otherwise.
pub const DEFAULT_CAPACITY: usize = 50;

#[derive(Debug, Clone)]
pub struct PrefetchCache {
    /// Membership index.
    members: HashSet<NormalizedPath>,

    /// Insertion order, oldest at the front.
    order: VecDeque<NormalizedPath>,

    /// Maximum number of entries (`None` = unbounded).
    capacity: Option<usize>,

    /// Entries dropped by [`limit`](Self::limit) so far.
    evicted: u64,
}

impl PrefetchCache {
    pub fn unbounded() -> Self {
        Self::with_capacity(None)
    }

    pub fn bounded(capacity: usize) -> Self {
        Self::with_capacity(Some(capacity))
    }

    pub fn with_capacity(capacity: Option<usize>) -> Self {
        Self {
            members: HashSet::new(),
            order: VecDeque::new(),
            capacity,
            evicted: 0,
        }
    }

    pub fn has(&self, url: &str) -> bool {
        self.members.contains(url)
    }

    /// Record `url`. Returns `true` if it was not already present.
    ///
    /// On a bounded cache this trims back to capacity before returning.
    pub fn add(&mut self, url: NormalizedPath) -> bool {
        if self.members.contains(url.as_str()) {
            return false;
        }
        self.members.insert(url.clone());
        self.order.push_back(url);
        self.limit();
        true
    }

    /// Evict oldest entries until the cache is within capacity.
    pub fn limit(&mut self) {
        let Some(capacity) = self.capacity else {
            return;
        };
        while self.order.len() > capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.members.remove(oldest.as_str());
                self.evicted += 1;
                debug!(url = %oldest, "Evicted prefetch record");
            }
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    pub fn evicted(&self) -> u64 {
        self.evicted
    }

    /// Cached paths, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &NormalizedPath> {
        self.order.iter()
    }
}

impl Default for PrefetchCache {
    fn default() -> Self {
        Self::bounded(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_is_idempotent() {
        let mut cache = PrefetchCache::unbounded();
        assert!(cache.add("/feed".into()));
        assert!(!cache.add("/feed".into()));
        assert_eq!(cache.len(), 1);
        assert!(cache.has("/feed"));
    }

    #[test]
    fn test_bounded_evicts_oldest_first() {
        let mut cache = PrefetchCache::bounded(2);
        cache.add("/a".into());
        cache.add("/b".into());
        cache.add("/c".into());

        assert_eq!(cache.len(), 2);
        assert!(!cache.has("/a"));
        assert!(cache.has("/b"));
        assert!(cache.has("/c"));
        assert_eq!(cache.evicted(), 1);
    }

    #[test]
    fn test_readd_does_not_refresh_position() {
        let mut cache = PrefetchCache::bounded(2);
        cache.add("/a".into());
        cache.add("/b".into());
        cache.add("/a".into());
        cache.add("/c".into());

        // FIFO, not LRU: "/a" is still the oldest.
        assert!(!cache.has("/a"));
        assert!(cache.has("/b"));
    }

    #[test]
    fn test_zero_capacity_holds_nothing() {
        let mut cache = PrefetchCache::bounded(0);
        assert!(cache.add("/a".into()));
        assert!(cache.is_empty());
    }
}
