//! The prefetch scheduler.
//!
//! Every candidate goes through the same gate: skip if its path is cached
//! or already pending, otherwise mark it pending and either dispatch it
//! right away (strong intent, or any intent on a high-end device) or queue
//! it for the drain loop (weak intent on a low-end device). A strong
//! intent for a path still waiting in the queue takes it out and
//! dispatches it right away.
//!
//! All mutable state sits behind one mutex and every check-then-add runs
//! inside a single critical section. Router calls are made outside it.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::runtime::Handle;
use tracing::{debug, info};
use uuid::Uuid;

use crate::cache::PrefetchCache;
use crate::config::Config;
use crate::device::{DeviceProfile, DeviceSignals};
use crate::error::{PrefetchError, Result};
use crate::intent::{IntentKind, PrefetchCandidate};
use crate::metrics::SchedulerMetrics;
use crate::navigation::Router;
use crate::route::NormalizedPath;
use crate::scheduler::queue::PriorityQueue;
use crate::scheduler::tick::{TickSource, TimerTicks};

/// What happened to a submitted candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitOutcome {
    /// Handed to a deferred task that issues it on the next turn.
    Dispatched,
    /// Waiting in the low-end queue.
    Queued,
    /// Already issued; nothing to do.
    AlreadyPrefetched,
    /// Already dispatched or queued.
    AlreadyPending,
}

impl SubmitOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, SubmitOutcome::Dispatched | SubmitOutcome::Queued)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SchedulerStats {
    pub submitted: u64,
    pub issued: u64,
    pub skipped: u64,
    pub failed: u64,
    pub queued: u64,
    pub evicted: u64,
}

struct SchedulerState {
    cache: PrefetchCache,
    pending: HashSet<NormalizedPath>,
    queue: PriorityQueue,
    /// A drain loop is running.
    processing: bool,
    stats: SchedulerStats,
}

struct Inner {
    id: Uuid,
    profile: DeviceProfile,
    router: Arc<dyn Router>,
    ticks: Arc<dyn TickSource>,
    runtime: Handle,
    metrics: SchedulerMetrics,
    state: Mutex<SchedulerState>,
}

/// Shared handle to one scheduler instance. Cloning is cheap.
#[derive(Clone)]
pub struct PrefetchScheduler {
    inner: Arc<Inner>,
}

pub struct SchedulerBuilder {
    router: Arc<dyn Router>,
    profile: DeviceProfile,
    cache: PrefetchCache,
    ticks: Option<Arc<dyn TickSource>>,
}

impl SchedulerBuilder {
    pub fn profile(mut self, profile: DeviceProfile) -> Self {
        self.profile = profile;
        self
    }

    pub fn cache(mut self, cache: PrefetchCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn ticks(mut self, ticks: Arc<dyn TickSource>) -> Self {
        self.ticks = Some(ticks);
        self
    }

    /// Apply cache sizing, device classification and tick cadence from `config`.
    pub fn configure(self, config: &Config, signals: &DeviceSignals) -> Self {
        let profile = DeviceProfile::classify(signals, &config.device);
        self.profile(profile)
            .cache(PrefetchCache::with_capacity(config.cache.capacity))
            .ticks(Arc::new(TimerTicks::new(config.queue.tick_fallback())))
    }

    /// Must be called from within a tokio runtime.
    pub fn build(self) -> Result<PrefetchScheduler> {
        let runtime = Handle::try_current().map_err(|_| PrefetchError::NoRuntime)?;
        let id = Uuid::new_v4();
        let metrics = SchedulerMetrics::new(id)?;
        let ticks = self.ticks.unwrap_or_else(|| {
            Arc::new(TimerTicks::new(Config::default().queue.tick_fallback()))
        });

        info!(
            instance = %id,
            low_end = self.profile.is_low_end,
            cache_capacity = ?self.cache.capacity(),
            "Prefetch scheduler ready"
        );

        Ok(PrefetchScheduler {
            inner: Arc::new(Inner {
                id,
                profile: self.profile,
                router: self.router,
                ticks,
                runtime,
                metrics,
                state: Mutex::new(SchedulerState {
                    cache: self.cache,
                    pending: HashSet::new(),
                    queue: PriorityQueue::new(),
                    processing: false,
                    stats: SchedulerStats::default(),
                }),
            }),
        })
    }
}

impl PrefetchScheduler {
    pub fn builder(router: Arc<dyn Router>) -> SchedulerBuilder {
        SchedulerBuilder {
            router,
            profile: DeviceProfile::HIGH_END,
            cache: PrefetchCache::default(),
            ticks: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    pub fn profile(&self) -> DeviceProfile {
        self.inner.profile
    }

    pub fn router(&self) -> Arc<dyn Router> {
        self.inner.router.clone()
    }

    pub fn runtime(&self) -> &Handle {
        &self.inner.runtime
    }

    pub fn metrics(&self) -> &SchedulerMetrics {
        &self.inner.metrics
    }

    /// Offer a candidate. Never blocks on the router and never fails.
    pub fn submit(&self, candidate: PrefetchCandidate) -> SubmitOutcome {
        let inner = &self.inner;
        let mut state = inner.state.lock();
        state.stats.submitted += 1;
        inner.metrics.submitted.inc();

        let outcome = if state.cache.has(candidate.url.as_str()) {
            SubmitOutcome::AlreadyPrefetched
        } else if state.pending.contains(candidate.url.as_str()) {
            // A strong intent pulls a queued path out of the low-end queue.
            if candidate.source.is_strong()
                && state.queue.remove(candidate.url.as_str()).is_some()
            {
                inner.metrics.queue_depth.set(state.queue.len() as i64);
                SubmitOutcome::Dispatched
            } else {
                SubmitOutcome::AlreadyPending
            }
        } else if candidate.source.is_strong() || !inner.profile.is_low_end {
            state.pending.insert(candidate.url.clone());
            SubmitOutcome::Dispatched
        } else {
            state.pending.insert(candidate.url.clone());
            SubmitOutcome::Queued
        };

        debug!(
            instance = %inner.id,
            url = %candidate.url,
            source = %candidate.source,
            priority = candidate.priority,
            outcome = ?outcome,
            "Prefetch candidate"
        );

        match outcome {
            SubmitOutcome::AlreadyPrefetched | SubmitOutcome::AlreadyPending => {
                state.stats.skipped += 1;
                inner.metrics.skipped.inc();
            }
            SubmitOutcome::Dispatched => {
                drop(state);
                let this = self.clone();
                inner.runtime.spawn(async move {
                    this.issue(candidate.url, candidate.source);
                });
            }
            SubmitOutcome::Queued => {
                state.queue.push(candidate);
                state.stats.queued += 1;
                inner.metrics.queued.inc();
                inner.metrics.queue_depth.set(state.queue.len() as i64);

                let start_drain = !state.processing;
                state.processing = true;
                drop(state);

                if start_drain {
                    let this = self.clone();
                    inner.runtime.spawn(async move { this.drain().await });
                }
            }
        }

        outcome
    }

    /// Issue `url` synchronously unless it is already cached.
    ///
    /// Returns `true` if a router call was made.
    pub fn prefetch_now(&self, url: NormalizedPath) -> bool {
        self.record_and_issue(url, None)
    }

    pub fn is_prefetched(&self, url: &str) -> bool {
        self.inner.state.lock().cache.has(url)
    }

    pub fn is_pending(&self, url: &str) -> bool {
        self.inner.state.lock().pending.contains(url)
    }

    /// No candidate is pending and no drain loop is running.
    pub fn is_idle(&self) -> bool {
        let state = self.inner.state.lock();
        state.pending.is_empty() && !state.processing
    }

    pub fn is_processing(&self) -> bool {
        self.inner.state.lock().processing
    }

    pub fn queue_len(&self) -> usize {
        self.inner.state.lock().queue.len()
    }

    pub fn cache_len(&self) -> usize {
        self.inner.state.lock().cache.len()
    }

    /// Cached paths, oldest first.
    pub fn cached_urls(&self) -> Vec<NormalizedPath> {
        self.inner.state.lock().cache.iter().cloned().collect()
    }

    pub fn stats(&self) -> SchedulerStats {
        let state = self.inner.state.lock();
        SchedulerStats {
            evicted: state.cache.evicted(),
            ..state.stats.clone()
        }
    }

    /// Deferred issue for a pending candidate.
    fn issue(&self, url: NormalizedPath, source: IntentKind) {
        self.record_and_issue(url, Some(source));
    }

    fn record_and_issue(&self, url: NormalizedPath, source: Option<IntentKind>) -> bool {
        let inner = &self.inner;
        {
            let mut state = inner.state.lock();
            if source.is_some() {
                state.pending.remove(url.as_str());
            }
            if !state.cache.add(url.clone()) {
                state.stats.skipped += 1;
                inner.metrics.skipped.inc();
                return false;
            }
            state.stats.issued += 1;
            inner.metrics.issued.inc();
        }

        match inner.router.prefetch(&url) {
            Ok(()) => {
                debug!(instance = %inner.id, url = %url, source = ?source, "Prefetch issued");
            }
            Err(e) => {
                debug!(instance = %inner.id, url = %url, error = %e, "Prefetch failed");
                inner.state.lock().stats.failed += 1;
                inner.metrics.failed.inc();
            }
        }
        true
    }

    /// Drain the queue one candidate per tick until it is empty.
    async fn drain(self) {
        debug!(instance = %self.inner.id, "Drain loop started");
        loop {
            self.inner.ticks.tick().await;

            let (next, more) = {
                let mut state = self.inner.state.lock();
                let next = state.queue.pop();
                let more = !state.queue.is_empty();
                if !more {
                    state.processing = false;
                }
                self.inner.metrics.queue_depth.set(state.queue.len() as i64);
                (next, more)
            };

            if let Some(candidate) = next {
                self.issue(candidate.url, candidate.source);
            }
            if !more {
                break;
            }
        }
        debug!(instance = %self.inner.id, "Drain loop finished");
    }
}
