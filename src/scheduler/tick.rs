//! Drain cadence for the low-end queue.
//!
//! A browser host drains on `requestIdleCallback` with a timeout, or on a
//! fixed `setTimeout` when idle callbacks are unavailable. [`IdleTicks`]
//! and [`TimerTicks`] are the two equivalents here.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;
use tracing::debug;

#[async_trait]
pub trait TickSource: Send + Sync {
    /// Resolve when the next queued prefetch may run.
    async fn tick(&self);
}

/// Fixed-delay ticks.
#[derive(Debug, Clone)]
pub struct TimerTicks {
    delay: Duration,
}

impl TimerTicks {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl TickSource for TimerTicks {
    async fn tick(&self) {
        tokio::time::sleep(self.delay).await;
    }
}

/// Host-side idle notification.
///
/// An idle notification delivered while nobody waits is kept for the next
/// waiter, so one idle period is never lost.
#[derive(Debug, Default)]
pub struct IdleSignal {
    notify: Notify,
}

impl IdleSignal {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Called by the host when the main thread goes idle.
    pub fn notify_idle(&self) {
        self.notify.notify_one();
    }
}

/// Ticks on idle notifications, bounded by a timeout.
#[derive(Debug, Clone)]
pub struct IdleTicks {
    signal: Arc<IdleSignal>,
    timeout: Duration,
}

impl IdleTicks {
    pub fn new(signal: Arc<IdleSignal>, timeout: Duration) -> Self {
        Self { signal, timeout }
    }
}

#[async_trait]
impl TickSource for IdleTicks {
    async fn tick(&self) {
        if tokio::time::timeout(self.timeout, self.signal.notify.notified())
            .await
            .is_err()
        {
            debug!(timeout_ms = self.timeout.as_millis() as u64, "Idle wait timed out");
        }
    }
}
