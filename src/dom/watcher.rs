//! Link watcher: keeps every internal anchor under visibility observation.
//!
//! An anchor is registered with the observer at most once for the life of
//! the watcher. DOM insertions that bring new links trigger a rescan,
//! throttled; a rescan suppressed by the throttle runs on the trailing
//! edge of the window instead of being dropped.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::config::ObserverConfig;
use crate::dom::{
    Anchor, Document, ElementId, ElementObserver, MutationRecord, VisibilityCallback,
};
use crate::intent::{IntentKind, PrefetchCandidate, Throttle, ThrottleState};
use crate::route::UrlNormalizer;
use crate::scheduler::PrefetchScheduler;

type RescanFn = fn(&WatcherInner) -> usize;

struct WatcherInner {
    scheduler: PrefetchScheduler,
    normalizer: UrlNormalizer,
    document: Arc<dyn Document>,
    observer: Arc<dyn ElementObserver>,
    margin_px: u32,

    /// Anchors already handed to the observer.
    observed: Mutex<HashSet<ElementId>>,

    rescan: Mutex<Throttle<RescanFn>>,

    /// A trailing rescan is scheduled.
    trailing: AtomicBool,

    on_visible: VisibilityCallback,
}

/// Cheap-clone handle; all clones share one set of observed anchors.
#[derive(Clone)]
pub struct LinkWatcher {
    inner: Arc<WatcherInner>,
}

impl LinkWatcher {
    pub fn new(
        scheduler: PrefetchScheduler,
        normalizer: UrlNormalizer,
        document: Arc<dyn Document>,
        observer: Arc<dyn ElementObserver>,
        config: &ObserverConfig,
    ) -> Self {
        let margin_px = config.margin_px(scheduler.profile().is_low_end);

        let visible_scheduler = scheduler.clone();
        let visible_normalizer = normalizer.clone();
        let on_visible: VisibilityCallback = Arc::new(move |anchor: &Anchor| {
            if let Some(url) = visible_normalizer.internal_path(&anchor.href) {
                visible_scheduler.submit(PrefetchCandidate::new(url, IntentKind::Viewport));
            }
        });

        Self {
            inner: Arc::new(WatcherInner {
                scheduler,
                normalizer,
                document,
                observer,
                margin_px,
                observed: Mutex::new(HashSet::new()),
                rescan: Mutex::new(Throttle::new(
                    config.rescan_throttle(),
                    WatcherInner::scan as RescanFn,
                )),
                trailing: AtomicBool::new(false),
                on_visible,
            }),
        }
    }

    /// Subscribe to mutations and observe the links already present.
    ///
    /// Returns the number of anchors registered by the initial scan.
    pub fn start(&self) -> usize {
        let weak: Weak<WatcherInner> = Arc::downgrade(&self.inner);
        self.inner.observer.observe_mutations(Arc::new(move |record: &MutationRecord| {
            if let Some(inner) = weak.upgrade() {
                WatcherInner::on_mutation(&inner, record);
            }
        }));

        if !self.inner.observer.supports_visibility() {
            warn!("No visibility observer available, prefetching links eagerly");
        }

        let registered = self.inner.rescan.lock().call(&*self.inner).unwrap_or(0);
        info!(
            registered,
            margin_px = self.inner.margin_px,
            "Link watcher started"
        );
        registered
    }

    /// Scan immediately, bypassing the rescan throttle.
    pub fn scan_now(&self) -> usize {
        self.inner.scan()
    }

    pub fn observed_count(&self) -> usize {
        self.inner.observed.lock().len()
    }

    pub fn margin_px(&self) -> u32 {
        self.inner.margin_px
    }
}

impl WatcherInner {
    fn scan(&self) -> usize {
        let eager = !self.observer.supports_visibility();
        let mut registered = 0;

        for anchor in self.document.anchors() {
            let Some(url) = self.normalizer.internal_path(&anchor.href) else {
                continue;
            };
            if self.scheduler.is_prefetched(url.as_str()) {
                continue;
            }
            if !self.observed.lock().insert(anchor.id) {
                continue;
            }

            if eager {
                self.scheduler.prefetch_now(url);
            } else {
                self.observer
                    .observe_visible(&anchor, self.margin_px, self.on_visible.clone());
            }
            registered += 1;
        }

        if registered > 0 {
            debug!(registered, eager, "Scanned document for links");
        }
        registered
    }

    fn on_mutation(this: &Arc<Self>, record: &MutationRecord) {
        if !record.adds_anchors() {
            return;
        }

        let mut rescan = this.rescan.lock();
        match rescan.check(tokio::time::Instant::now()) {
            ThrottleState::Ready => {
                rescan.call(&**this);
            }
            ThrottleState::Suppressed { remaining } => {
                drop(rescan);
                if this.trailing.swap(true, Ordering::AcqRel) {
                    return;
                }
                let weak = Arc::downgrade(this);
                this.scheduler.runtime().spawn(async move {
                    tokio::time::sleep(remaining).await;
                    if let Some(inner) = weak.upgrade() {
                        inner.trailing.store(false, Ordering::Release);
                        inner.rescan.lock().call(&*inner);
                    }
                });
                debug!(delay_ms = remaining.as_millis() as u64, "Rescan deferred");
            }
        }
    }
}
