//! Pointer, touch and keyboard intent handlers.
//!
//! Each handler resolves the event target to its enclosing anchor, keeps
//! only internal links, and submits a candidate. Hover and touch-start are
//! throttled independently so rapid pointer travel across many links does
//! not hit-test on every event. Events inside the window are coalesced: the
//! latest target runs when the window closes.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::time::Instant;
use tracing::debug;

use crate::config::IntentConfig;
use crate::dom::{Document, ElementId, Point};
use crate::intent::{
    IntentKind, MouseIntent, PrefetchCandidate, Throttle, ThrottleState, TrajectoryPredictor,
};
use crate::navigation::MouseButton;
use crate::route::UrlNormalizer;
use crate::scheduler::{PrefetchScheduler, SubmitOutcome};

type AnchorHandler = Box<dyn FnMut(ElementId) -> Option<SubmitOutcome> + Send>;

struct DetectorContext {
    scheduler: PrefetchScheduler,
    normalizer: UrlNormalizer,
    document: Arc<dyn Document>,
}

impl DetectorContext {
    fn propose(&self, target: ElementId, kind: IntentKind) -> Option<SubmitOutcome> {
        let anchor = self.document.closest_anchor(target)?;
        let url = self.normalizer.internal_path(&anchor.href)?;
        Some(self.scheduler.submit(PrefetchCandidate::new(url, kind)))
    }
}

/// A throttled handler that keeps the latest suppressed target.
struct Coalesced {
    throttle: Mutex<Throttle<AnchorHandler>>,
    /// Target waiting for the trailing edge; `Some` while a flush is scheduled.
    latest: Mutex<Option<ElementId>>,
}

impl Coalesced {
    fn new(throttle: Throttle<AnchorHandler>) -> Arc<Self> {
        Arc::new(Self {
            throttle: Mutex::new(throttle),
            latest: Mutex::new(None),
        })
    }

    fn offer(this: &Arc<Self>, target: ElementId, runtime: &Handle) -> Option<SubmitOutcome> {
        let mut throttle = this.throttle.lock();
        match throttle.check(Instant::now()) {
            ThrottleState::Ready => {
                // Newer than anything still waiting.
                this.latest.lock().take();
                throttle.call(target).flatten()
            }
            ThrottleState::Suppressed { remaining } => {
                drop(throttle);
                if this.latest.lock().replace(target).is_none() {
                    let coalesced = this.clone();
                    runtime.spawn(async move {
                        tokio::time::sleep(remaining).await;
                        coalesced.flush();
                    });
                    debug!(
                        element = %target,
                        delay_ms = remaining.as_millis() as u64,
                        "Pointer intent deferred"
                    );
                }
                None
            }
        }
    }

    fn flush(&self) {
        let Some(target) = self.latest.lock().take() else {
            return;
        };
        self.throttle.lock().call(target);
    }
}

pub struct IntentDetectors {
    context: Arc<DetectorContext>,
    hover: Arc<Coalesced>,
    touch: Arc<Coalesced>,
    trajectory: Mutex<TrajectoryPredictor>,
}

impl IntentDetectors {
    pub fn new(
        scheduler: PrefetchScheduler,
        normalizer: UrlNormalizer,
        document: Arc<dyn Document>,
        config: &IntentConfig,
    ) -> Self {
        let context = Arc::new(DetectorContext {
            scheduler,
            normalizer,
            document,
        });

        let hover_ctx = context.clone();
        let hover: AnchorHandler =
            Box::new(move |target| hover_ctx.propose(target, IntentKind::Hover));
        let touch_ctx = context.clone();
        let touch: AnchorHandler =
            Box::new(move |target| touch_ctx.propose(target, IntentKind::TouchStart));

        Self {
            context,
            hover: Coalesced::new(Throttle::new(config.pointer_throttle(), hover)),
            touch: Coalesced::new(Throttle::new(config.pointer_throttle(), touch)),
            trajectory: Mutex::new(TrajectoryPredictor::new(config.clone())),
        }
    }

    /// Pointer entered `target`.
    ///
    /// `None` when not on an internal link, or when deferred to the end of
    /// the throttle window (a later hover in the same window replaces it).
    pub fn on_hover(&self, target: ElementId) -> Option<SubmitOutcome> {
        Coalesced::offer(&self.hover, target, self.context.scheduler.runtime())
    }

    /// First touch contact on `target`. Throttled like [`on_hover`](Self::on_hover).
    pub fn on_touch_start(&self, target: ElementId) -> Option<SubmitOutcome> {
        Coalesced::offer(&self.touch, target, self.context.scheduler.runtime())
    }

    /// Keyboard focus moved to `target`.
    pub fn on_focus(&self, target: ElementId) -> Option<SubmitOutcome> {
        self.context.propose(target, IntentKind::Focus)
    }

    /// Mouse button pressed on `target`; only the primary button counts.
    pub fn on_pointer_down(&self, target: ElementId, button: MouseButton) -> Option<SubmitOutcome> {
        if button != MouseButton::Primary {
            return None;
        }
        self.context.propose(target, IntentKind::PointerDown)
    }

    /// Pointer moved to `pos`.
    pub fn on_mouse_move(&self, pos: Point) -> Option<SubmitOutcome> {
        let candidate = self.trajectory.lock().observe(
            pos,
            Instant::now(),
            self.context.document.as_ref(),
            &self.context.normalizer,
        )?;
        Some(self.context.scheduler.submit(candidate))
    }

    pub fn mouse_intent(&self) -> MouseIntent {
        self.trajectory.lock().intent().clone()
    }
}
