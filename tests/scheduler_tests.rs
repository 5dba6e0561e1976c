//! Integration tests for the prefetch scheduler.

use std::sync::Arc;
use std::time::Duration;

use nav_prefetch::cache::PrefetchCache;
use nav_prefetch::config::Config;
use nav_prefetch::device::{DeviceProfile, DeviceSignals};
use nav_prefetch::intent::{IntentKind, PrefetchCandidate};
use nav_prefetch::navigation::RecordingRouter;
use nav_prefetch::scheduler::{IdleSignal, IdleTicks, PrefetchScheduler, SubmitOutcome, TimerTicks};

fn candidate(url: &str, kind: IntentKind, priority: f64) -> PrefetchCandidate {
    PrefetchCandidate::new(url.into(), kind).with_priority(priority)
}

fn paths(router: &RecordingRouter) -> Vec<String> {
    router
        .prefetched()
        .into_iter()
        .map(|p| p.into_inner())
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_queue_drains_by_priority() {
    let router = RecordingRouter::new();
    let scheduler = PrefetchScheduler::builder(router.clone())
        .profile(DeviceProfile::LOW_END)
        .ticks(Arc::new(TimerTicks::new(Duration::from_millis(150))))
        .build()
        .unwrap();

    scheduler.submit(candidate("/a", IntentKind::Viewport, 1.0));
    scheduler.submit(candidate("/b", IntentKind::Viewport, 10.0));
    scheduler.submit(candidate("/c", IntentKind::Viewport, 5.0));
    assert_eq!(scheduler.queue_len(), 3);
    assert_eq!(router.prefetch_count(), 0);

    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(paths(&router), vec!["/b", "/c", "/a"]);
    assert!(scheduler.is_idle());
    assert!(!scheduler.is_processing());
}

#[tokio::test(start_paused = true)]
async fn test_one_item_per_tick() {
    let router = RecordingRouter::new();
    let scheduler = PrefetchScheduler::builder(router.clone())
        .profile(DeviceProfile::LOW_END)
        .ticks(Arc::new(TimerTicks::new(Duration::from_millis(100))))
        .build()
        .unwrap();

    for i in 0..3 {
        scheduler.submit(candidate(&format!("/t/{i}"), IntentKind::Viewport, 1.0));
    }

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(router.prefetch_count(), 1);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(router.prefetch_count(), 2);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(router.prefetch_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_push_during_drain_joins_running_loop() {
    let router = RecordingRouter::new();
    let scheduler = PrefetchScheduler::builder(router.clone())
        .profile(DeviceProfile::LOW_END)
        .ticks(Arc::new(TimerTicks::new(Duration::from_millis(100))))
        .build()
        .unwrap();

    scheduler.submit(candidate("/low", IntentKind::Viewport, 1.0));
    scheduler.submit(candidate("/mid", IntentKind::Viewport, 2.0));
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(paths(&router), vec!["/mid"]);

    // Higher priority than what is left: drained next.
    scheduler.submit(candidate("/urgent", IntentKind::Trajectory, 40.0));
    assert!(scheduler.is_processing());

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(paths(&router), vec!["/mid", "/urgent", "/low"]);
}

#[tokio::test(start_paused = true)]
async fn test_no_double_issue_for_cached_url() {
    let router = RecordingRouter::new();
    let scheduler = PrefetchScheduler::builder(router.clone()).build().unwrap();

    scheduler.submit(candidate("/x", IntentKind::Hover, 100.0));
    tokio::time::sleep(Duration::from_millis(1)).await;
    assert_eq!(router.prefetch_count(), 1);

    for kind in [IntentKind::Hover, IntentKind::TouchStart, IntentKind::Viewport] {
        let outcome = scheduler.submit(PrefetchCandidate::new("/x".into(), kind));
        assert_eq!(outcome, SubmitOutcome::AlreadyPrefetched);
    }
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(router.prefetch_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_high_end_dispatches_without_queue() {
    let router = RecordingRouter::new();
    let scheduler = PrefetchScheduler::builder(router.clone())
        .profile(DeviceProfile::HIGH_END)
        .build()
        .unwrap();

    for i in 0..5 {
        let outcome = scheduler.submit(candidate(&format!("/v/{i}"), IntentKind::Viewport, 1.0));
        assert_eq!(outcome, SubmitOutcome::Dispatched);
    }
    assert_eq!(scheduler.queue_len(), 0);

    tokio::time::sleep(Duration::from_millis(1)).await;
    assert_eq!(router.prefetch_count(), 5);
}

#[tokio::test(start_paused = true)]
async fn test_low_end_sixty_candidates() {
    let router = RecordingRouter::new();
    let signals = DeviceSignals {
        hardware_concurrency: Some(2),
        ..Default::default()
    };
    let scheduler = PrefetchScheduler::builder(router.clone())
        .configure(&Config::default(), &signals)
        .build()
        .unwrap();
    assert!(scheduler.profile().is_low_end);

    for i in 0..60 {
        let outcome = scheduler.submit(candidate(
            &format!("/page/{i}"),
            IntentKind::Viewport,
            i as f64,
        ));
        assert_eq!(outcome, SubmitOutcome::Queued);
    }

    tokio::time::sleep(Duration::from_secs(30)).await;

    // Every distinct candidate is issued once; the cache only bounds tracking.
    assert_eq!(router.prefetch_count(), 60);
    assert_eq!(scheduler.cache_len(), 50);

    // Drained highest priority first, so the 50 most recent insertions are
    // pages 49 down to 0.
    let issued = paths(&router);
    assert_eq!(issued.first().map(String::as_str), Some("/page/59"));
    assert_eq!(issued.last().map(String::as_str), Some("/page/0"));
    for i in 0..50 {
        assert!(scheduler.is_prefetched(&format!("/page/{i}")), "page {i}");
    }
    for i in 50..60 {
        assert!(!scheduler.is_prefetched(&format!("/page/{i}")), "page {i}");
    }

    let stats = scheduler.stats();
    assert_eq!(stats.issued, 60);
    assert_eq!(stats.queued, 60);
    assert_eq!(stats.evicted, 10);
}

#[tokio::test(start_paused = true)]
async fn test_idle_ticks_drive_queue() {
    let router = RecordingRouter::new();
    let idle = IdleSignal::new();
    let scheduler = PrefetchScheduler::builder(router.clone())
        .profile(DeviceProfile::LOW_END)
        .ticks(Arc::new(IdleTicks::new(idle.clone(), Duration::from_secs(2))))
        .build()
        .unwrap();

    scheduler.submit(candidate("/first", IntentKind::Viewport, 2.0));
    scheduler.submit(candidate("/second", IntentKind::Viewport, 1.0));

    idle.notify_idle();
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(paths(&router), vec!["/first"]);

    // No idle signal: the timeout still guarantees progress.
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(paths(&router), vec!["/first", "/second"]);
}

#[tokio::test(start_paused = true)]
async fn test_independent_instances() {
    let router_a = RecordingRouter::new();
    let router_b = RecordingRouter::new();
    let a = PrefetchScheduler::builder(router_a.clone()).build().unwrap();
    let b = PrefetchScheduler::builder(router_b.clone())
        .cache(PrefetchCache::unbounded())
        .build()
        .unwrap();
    assert_ne!(a.id(), b.id());

    a.prefetch_now("/shared".into());
    assert!(a.is_prefetched("/shared"));
    assert!(!b.is_prefetched("/shared"));

    b.prefetch_now("/shared".into());
    assert_eq!(router_a.prefetch_count(), 1);
    assert_eq!(router_b.prefetch_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_prefetch_now_preempts_queued_entry() {
    let router = RecordingRouter::new();
    let scheduler = PrefetchScheduler::builder(router.clone())
        .profile(DeviceProfile::LOW_END)
        .build()
        .unwrap();

    scheduler.submit(candidate("/later", IntentKind::Viewport, 1.0));
    assert!(scheduler.prefetch_now("/later".into()));

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(router.prefetch_count(), 1);
    assert!(scheduler.is_idle());
}

#[tokio::test(start_paused = true)]
async fn test_metrics_track_stats() {
    let router = RecordingRouter::new();
    let scheduler = PrefetchScheduler::builder(router.clone()).build().unwrap();

    scheduler.submit(candidate("/m", IntentKind::Hover, 100.0));
    scheduler.submit(candidate("/m", IntentKind::Hover, 100.0));
    tokio::time::sleep(Duration::from_millis(1)).await;

    let metrics = scheduler.metrics();
    assert_eq!(metrics.submitted.get(), 2);
    assert_eq!(metrics.issued.get(), 1);
    assert_eq!(metrics.skipped.get(), 1);
    let text = metrics.encode().unwrap();
    assert!(text.contains("nav_prefetch_submitted_total"));
    assert!(text.contains(&scheduler.id().to_string()));
}

#[tokio::test(start_paused = true)]
async fn test_hover_promotes_queued_candidate() {
    let router = RecordingRouter::new();
    let scheduler = PrefetchScheduler::builder(router.clone())
        .profile(DeviceProfile::LOW_END)
        .build()
        .unwrap();

    for i in 0..40 {
        scheduler.submit(candidate(&format!("/v/{i}"), IntentKind::Viewport, 1.0));
    }
    assert_eq!(scheduler.queue_len(), 40);

    let outcome = scheduler.submit(PrefetchCandidate::new("/v/39".into(), IntentKind::Hover));
    assert_eq!(outcome, SubmitOutcome::Dispatched);
    assert_eq!(scheduler.queue_len(), 39);

    tokio::time::sleep(Duration::from_millis(1)).await;
    assert_eq!(paths(&router), vec!["/v/39"]);

    // Later intents find it cached.
    assert_eq!(
        scheduler.submit(PrefetchCandidate::new("/v/39".into(), IntentKind::Focus)),
        SubmitOutcome::AlreadyPrefetched
    );

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(router.prefetch_count(), 40);
    assert!(scheduler.is_idle());
}

#[tokio::test(start_paused = true)]
async fn test_hover_on_dispatched_candidate_is_pending() {
    let router = RecordingRouter::new();
    let scheduler = PrefetchScheduler::builder(router.clone())
        .profile(DeviceProfile::LOW_END)
        .build()
        .unwrap();

    assert_eq!(
        scheduler.submit(PrefetchCandidate::new("/t".into(), IntentKind::TouchStart)),
        SubmitOutcome::Dispatched
    );
    assert_eq!(
        scheduler.submit(PrefetchCandidate::new("/t".into(), IntentKind::Hover)),
        SubmitOutcome::AlreadyPending
    );
    tokio::time::sleep(Duration::from_millis(1)).await;
    assert_eq!(router.prefetch_count(), 1);
}
