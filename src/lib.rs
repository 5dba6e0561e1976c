//! nav-prefetch: speculative route prefetching for instant page navigation.
//!
//! Watches user intent (hover, touch, focus, pointer-down, links scrolling
//! into view, pointer trajectory) and warms likely next routes through the
//! application router before the user clicks:
//!   intent signal → candidate → dedup cache → immediate or queued prefetch
//!
//! Low-end devices queue weak-intent prefetches and drain them one per
//! idle tick. Committed navigation never depends on prefetch state.

pub mod cache;
pub mod config;
pub mod device;
pub mod dom;
pub mod error;
pub mod intent;
pub mod metrics;
pub mod navigation;
pub mod replay;
pub mod route;
pub mod scheduler;
pub mod warmup;

pub use error::{PrefetchError, Result, RouterError};
pub use scheduler::PrefetchScheduler;
