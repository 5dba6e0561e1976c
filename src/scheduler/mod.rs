//! Prefetch scheduling.
//!
//! - [`engine`]: `PrefetchScheduler`, the dedup gate and dispatch paths
//! - [`queue`]: priority queue drained one item per tick on low-end devices
//! - [`tick`]: idle-signal and fixed-timer tick sources

pub mod engine;
pub mod queue;
pub mod tick;

pub use engine::{PrefetchScheduler, SchedulerBuilder, SchedulerStats, SubmitOutcome};
pub use queue::PriorityQueue;
pub use tick::{IdleSignal, IdleTicks, TickSource, TimerTicks};
