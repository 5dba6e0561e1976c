//! Replay of recorded interaction traces.
//!
//! A trace describes a device, the links on the initial page and a timed
//! sequence of user events. Replaying it wires the whole subsystem
//! (scheduler, watcher, detectors, navigation trigger, warmup) against an
//! in-memory DOM and a recording router, then reports what was prefetched.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::device::{DeviceProfile, DeviceSignals};
use crate::dom::{
    AddedNode, Anchor, Document, ElementId, LinkWatcher, ManualObserver, MemoryDocument,
    MutationRecord, Point, Rect,
};
use crate::error::Result;
use crate::intent::IntentDetectors;
use crate::navigation::{
    ClickEvent, ClickOutcome, Modifiers, MouseButton, NavigationTrigger, RecordingRouter,
};
use crate::route::{LinkTarget, NormalizedPath, UrlNormalizer};
use crate::scheduler::{IdleSignal, IdleTicks, PrefetchScheduler, SchedulerStats, TimerTicks};
use crate::warmup::Warmup;

/// Upper bound on waiting for the queue to drain after the last event.
const SETTLE_LIMIT: Duration = Duration::from_secs(600);

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Trace {
    pub device: DeviceSignals,

    /// The host delivers idle notifications (`idle` events).
    pub idle_signal: bool,

    /// The host has an intersection observer.
    pub visibility_supported: bool,

    pub anchors: Vec<TraceAnchor>,
    pub events: Vec<TimedEvent>,
}

impl Default for Trace {
    fn default() -> Self {
        Self {
            device: DeviceSignals::default(),
            idle_signal: false,
            visibility_supported: true,
            anchors: Vec::new(),
            events: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TraceAnchor {
    pub id: ElementId,
    pub href: String,
    #[serde(default)]
    pub rect: Option<Rect>,
}

impl TraceAnchor {
    fn anchor(&self) -> Anchor {
        Anchor {
            id: self.id,
            href: self.href.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TimedEvent {
    /// Offset from the start of the replay.
    #[serde(default)]
    pub at_ms: u64,
    #[serde(flatten)]
    pub event: TraceEvent,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TraceEvent {
    Hover {
        target: ElementId,
    },
    TouchStart {
        target: ElementId,
    },
    Focus {
        target: ElementId,
    },
    PointerDown {
        target: ElementId,
        #[serde(default)]
        button: MouseButton,
    },
    MouseMove {
        x: f64,
        y: f64,
    },
    Visible {
        target: ElementId,
    },
    /// New links inserted; `nested` wraps them in one container node.
    Insert {
        anchors: Vec<TraceAnchor>,
        #[serde(default)]
        nested: bool,
    },
    Click {
        target: ElementId,
        #[serde(default)]
        button: MouseButton,
        #[serde(default)]
        modifiers: Modifiers,
    },
    Navigate {
        url: String,
    },
    /// The destination page finished rendering.
    NavigationComplete,
    Idle,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClickReport {
    pub target: ElementId,
    pub href: Option<String>,
    pub outcome: ClickOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReplayReport {
    pub instance_id: Uuid,
    pub profile: DeviceProfile,
    pub stats: SchedulerStats,
    pub observed_links: usize,
    pub warmup_accepted: usize,
    /// Router prefetch calls, in issue order.
    pub prefetched: Vec<NormalizedPath>,
    pub navigations: Vec<String>,
    /// Navigation still in flight when the trace ended.
    pub in_flight: Option<String>,
    pub clicks: Vec<ClickReport>,
    /// Cache contents at the end, oldest first.
    pub cached: Vec<NormalizedPath>,
}

impl Trace {
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }
}

/// Replay `trace` and return the report along with the scheduler used,
/// whose metrics stay readable afterwards.
pub async fn run(config: &Config, trace: &Trace) -> Result<(ReplayReport, PrefetchScheduler)> {
    let normalizer = UrlNormalizer::new(&config.origin)?;
    let router = RecordingRouter::new();
    let idle = IdleSignal::new();

    let mut builder = PrefetchScheduler::builder(router.clone()).configure(config, &trace.device);
    builder = if trace.idle_signal {
        builder.ticks(Arc::new(IdleTicks::new(idle.clone(), config.queue.idle_timeout())))
    } else {
        builder.ticks(Arc::new(TimerTicks::new(config.queue.tick_fallback())))
    };
    let scheduler = builder.build()?;

    let document = Arc::new(MemoryDocument::new());
    for anchor in &trace.anchors {
        document.insert(anchor.anchor(), anchor.rect);
    }
    let observer = Arc::new(if trace.visibility_supported {
        ManualObserver::new()
    } else {
        ManualObserver::without_visibility()
    });

    let watcher = LinkWatcher::new(
        scheduler.clone(),
        normalizer.clone(),
        document.clone(),
        observer.clone(),
        &config.observer,
    );
    let detectors = IntentDetectors::new(
        scheduler.clone(),
        normalizer.clone(),
        document.clone(),
        &config.intent,
    );
    let trigger = NavigationTrigger::new(scheduler.clone(), normalizer.clone());

    let warmup = if config.warmup.enabled {
        let mut warmup = Warmup::new(scheduler.clone(), &normalizer, &config.warmup);
        if trace.idle_signal {
            warmup = warmup.on_idle(idle.clone(), config.warmup.idle_timeout());
        }
        Some(warmup.spawn())
    } else {
        None
    };

    watcher.start();

    let start = Instant::now();
    let mut clicks = Vec::new();
    for timed in &trace.events {
        tokio::time::sleep_until(start + Duration::from_millis(timed.at_ms)).await;
        debug!(at_ms = timed.at_ms, event = ?timed.event, "Replaying event");

        match &timed.event {
            TraceEvent::Hover { target } => {
                detectors.on_hover(*target);
            }
            TraceEvent::TouchStart { target } => {
                detectors.on_touch_start(*target);
            }
            TraceEvent::Focus { target } => {
                detectors.on_focus(*target);
            }
            TraceEvent::PointerDown { target, button } => {
                detectors.on_pointer_down(*target, *button);
            }
            TraceEvent::MouseMove { x, y } => {
                detectors.on_mouse_move(Point::new(*x, *y));
            }
            TraceEvent::Visible { target } => {
                if !observer.reveal(*target) {
                    debug!(target = %target, "Visible event for an unobserved element");
                }
            }
            TraceEvent::Insert { anchors, nested } => {
                for anchor in anchors {
                    document.insert(anchor.anchor(), anchor.rect);
                }
                let inserted: Vec<Anchor> = anchors.iter().map(TraceAnchor::anchor).collect();
                let added = if *nested {
                    vec![AddedNode::Subtree { anchors: inserted }]
                } else {
                    inserted.into_iter().map(AddedNode::Anchor).collect()
                };
                observer.mutate(&MutationRecord { added });
            }
            TraceEvent::Click {
                target,
                button,
                modifiers,
            } => {
                let event = ClickEvent {
                    button: *button,
                    modifiers: *modifiers,
                };
                let href = document.closest_anchor(*target).map(|a| a.href);
                let outcome = match &href {
                    Some(href) => trigger.on_click(&event, &LinkTarget::Href(href.clone())),
                    None => ClickOutcome::Default,
                };
                clicks.push(ClickReport {
                    target: *target,
                    href,
                    outcome,
                });
            }
            TraceEvent::Navigate { url } => {
                if let Err(e) = trigger.navigate(url) {
                    warn!(url = %url, error = %e, "Navigation failed");
                }
            }
            TraceEvent::NavigationComplete => trigger.complete_navigation(),
            TraceEvent::Idle => idle.notify_idle(),
        }
    }

    let warmup_accepted = match warmup {
        Some(handle) => handle.await.unwrap_or_else(|e| {
            warn!(error = %e, "Warmup task failed");
            0
        }),
        None => 0,
    };

    settle(&scheduler, &idle, config.queue.tick_fallback()).await;

    let report = ReplayReport {
        instance_id: scheduler.id(),
        profile: scheduler.profile(),
        stats: scheduler.stats(),
        observed_links: watcher.observed_count(),
        warmup_accepted,
        prefetched: router.prefetched(),
        navigations: router.pushed(),
        in_flight: trigger.target_url(),
        clicks,
        cached: scheduler.cached_urls(),
    };

    info!(
        issued = report.stats.issued,
        skipped = report.stats.skipped,
        cached = report.cached.len(),
        "Replay finished"
    );

    Ok((report, scheduler))
}

/// Wait until nothing is pending, nudging the idle signal so an idle-driven
/// queue keeps draining.
async fn settle(scheduler: &PrefetchScheduler, idle: &IdleSignal, poll: Duration) {
    let deadline = Instant::now() + SETTLE_LIMIT;
    while !scheduler.is_idle() {
        if Instant::now() >= deadline {
            warn!(
                queued = scheduler.queue_len(),
                "Gave up waiting for the prefetch queue to drain"
            );
            return;
        }
        idle.notify_idle();
        tokio::time::sleep(poll).await;
    }
}
