//! Priority queue for deferred prefetches on low-end devices.
//!
//! Kept sorted on insert: higher priority first, equal priorities in
//! arrival order.

use std::collections::VecDeque;

use tracing::debug;

use crate::intent::PrefetchCandidate;

#[derive(Debug, Default)]
pub struct PriorityQueue {
    items: VecDeque<PrefetchCandidate>,
}

impl PriorityQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert behind every candidate of equal or higher priority.
    pub fn push(&mut self, candidate: PrefetchCandidate) {
        let pos = self
            .items
            .iter()
            .position(|existing| existing.priority < candidate.priority)
            .unwrap_or(self.items.len());

        debug!(
            url = %candidate.url,
            priority = candidate.priority,
            source = %candidate.source,
            position = pos,
            "Queued prefetch"
        );

        self.items.insert(pos, candidate);
    }

    /// Remove and return the highest-priority candidate.
    pub fn pop(&mut self) -> Option<PrefetchCandidate> {
        self.items.pop_front()
    }

    /// Take the queued candidate for `url` out of the queue.
    pub fn remove(&mut self, url: &str) -> Option<PrefetchCandidate> {
        let pos = self.items.iter().position(|c| c.url.as_str() == url)?;
        self.items.remove(pos)
    }

    pub fn contains(&self, url: &str) -> bool {
        self.items.iter().any(|c| c.url.as_str() == url)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
