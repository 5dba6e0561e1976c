//! Critical-route warmup.
//!
//! Once per scheduler, after the page first goes idle, the configured
//! routes are submitted one by one with a short stagger between them.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::info;

use crate::config::WarmupConfig;
use crate::intent::{IntentKind, PrefetchCandidate};
use crate::route::{NormalizedPath, UrlNormalizer};
use crate::scheduler::{IdleSignal, IdleTicks, PrefetchScheduler, TickSource, TimerTicks};

/// Fallback delay before warming when the host has no idle signal.
const NO_IDLE_DELAY: Duration = Duration::from_millis(100);

pub struct Warmup {
    scheduler: PrefetchScheduler,
    routes: Vec<NormalizedPath>,
    stagger: Duration,
    start: Arc<dyn TickSource>,
}

impl Warmup {
    /// Routes that are not internal to `normalizer`'s origin are dropped.
    pub fn new(
        scheduler: PrefetchScheduler,
        normalizer: &UrlNormalizer,
        config: &WarmupConfig,
    ) -> Self {
        let routes = config
            .routes
            .iter()
            .filter_map(|route| normalizer.internal_path(route))
            .collect();

        Self {
            scheduler,
            routes,
            stagger: config.stagger(),
            start: Arc::new(TimerTicks::new(NO_IDLE_DELAY)),
        }
    }

    /// Start on the host's idle signal (bounded by `timeout`) instead of a fixed delay.
    pub fn on_idle(mut self, signal: Arc<IdleSignal>, timeout: Duration) -> Self {
        self.start = Arc::new(IdleTicks::new(signal, timeout));
        self
    }

    pub fn routes(&self) -> &[NormalizedPath] {
        &self.routes
    }

    /// Run the warmup on the scheduler's runtime.
    ///
    /// The task resolves to the number of routes the scheduler accepted.
    pub fn spawn(self) -> JoinHandle<usize> {
        let runtime = self.scheduler.runtime().clone();
        runtime.spawn(self.run())
    }

    async fn run(self) -> usize {
        self.start.tick().await;

        let mut accepted = 0;
        for (i, route) in self.routes.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.stagger).await;
            }
            let outcome = self
                .scheduler
                .submit(PrefetchCandidate::new(route.clone(), IntentKind::Warmup));
            if outcome.is_accepted() {
                accepted += 1;
            }
        }

        info!(
            routes = self.routes.len(),
            accepted,
            "Critical route warmup finished"
        );
        accepted
    }
}
