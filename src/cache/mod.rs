//! Deduplication of issued prefetches.
//!
//! - [`prefetch_cache`]: membership set of prefetched paths, optionally
//!   bounded with FIFO eviction

pub mod prefetch_cache;

pub use prefetch_cache::{PrefetchCache, DEFAULT_CAPACITY};
