//! End-to-end tests: configuration loading and trace replay.

use std::collections::HashSet;
use std::io::Write;

use nav_prefetch::config::Config;
use nav_prefetch::navigation::ClickOutcome;
use nav_prefetch::replay::{self, Trace};
use nav_prefetch::PrefetchError;

const LOW_END_TRACE: &str = r#"{
    "device": {"hardware_concurrency": 2},
    "anchors": [
        {"id": 1, "href": "/feed?sort=new"},
        {"id": 2, "href": "/profile", "rect": {"x": 0, "y": 100, "width": 80, "height": 20}},
        {"id": 3, "href": "https://elsewhere.example/"}
    ],
    "events": [
        {"at_ms": 0, "kind": "hover", "target": 2},
        {"at_ms": 10, "kind": "visible", "target": 1},
        {"at_ms": 20, "kind": "click", "target": 2, "modifiers": {"ctrl": true}},
        {"at_ms": 30, "kind": "click", "target": 2},
        {"at_ms": 40, "kind": "click", "target": 3},
        {"at_ms": 50, "kind": "navigate", "url": "/faq"}
    ]
}"#;

fn paths(list: &[nav_prefetch::route::NormalizedPath]) -> Vec<&str> {
    list.iter().map(|p| p.as_str()).collect()
}

#[tokio::test(start_paused = true)]
async fn test_replay_low_end_session() {
    let trace: Trace = serde_json::from_str(LOW_END_TRACE).unwrap();
    let (report, scheduler) = replay::run(&Config::default(), &trace).await.unwrap();

    assert!(report.profile.is_low_end);
    assert_eq!(report.instance_id, scheduler.id());
    assert_eq!(report.observed_links, 2);

    // /feed was already pending when warmup reached it.
    assert_eq!(report.warmup_accepted, 3);

    let prefetched = paths(&report.prefetched);
    assert_eq!(prefetched[0], "/profile");
    let unique: HashSet<&str> = prefetched.iter().copied().collect();
    assert_eq!(unique.len(), prefetched.len(), "a path was prefetched twice");
    assert_eq!(
        unique,
        HashSet::from(["/profile", "/feed", "/cabinet", "/news", "/auth"])
    );

    let outcomes: Vec<ClickOutcome> = report.clicks.iter().map(|c| c.outcome).collect();
    assert_eq!(
        outcomes,
        vec![ClickOutcome::Default, ClickOutcome::Intercepted, ClickOutcome::Default]
    );
    assert_eq!(report.navigations, vec!["/profile", "/faq"]);
    assert_eq!(report.in_flight.as_deref(), Some("/faq"));

    assert_eq!(report.stats.issued, 5);
    assert_eq!(report.cached.len(), 5);
    assert!(scheduler.is_idle());
    assert_eq!(scheduler.metrics().issued.get(), 5);

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["instance_id"], scheduler.id().to_string());
    assert_eq!(json["profile"]["is_low_end"], true);
    assert_eq!(json["clicks"][1]["outcome"], "intercepted");
}

#[tokio::test(start_paused = true)]
async fn test_replay_eager_fallback_with_idle_signal() {
    let trace: Trace = serde_json::from_str(
        r#"{
            "idle_signal": true,
            "visibility_supported": false,
            "anchors": [
                {"id": 1, "href": "/feed"},
                {"id": 2, "href": "/profile"}
            ],
            "events": [
                {"at_ms": 5, "kind": "idle"},
                {"at_ms": 10, "kind": "focus", "target": 2},
                {"at_ms": 20, "kind": "navigate", "url": "/profile"},
                {"at_ms": 30, "kind": "navigation_complete"}
            ]
        }"#,
    )
    .unwrap();

    let (report, _) = replay::run(&Config::default(), &trace).await.unwrap();

    assert!(!report.profile.is_low_end);
    let prefetched = paths(&report.prefetched);
    // Without an intersection observer every link is prefetched at start.
    assert_eq!(&prefetched[..2], &["/feed", "/profile"]);
    assert_eq!(report.warmup_accepted, 3);
    assert_eq!(prefetched.len(), 5);
    assert_eq!(report.navigations, vec!["/profile"]);
    assert!(report.in_flight.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_replay_with_warmup_disabled() {
    let mut config = Config::default();
    config.warmup.enabled = false;

    let trace: Trace = serde_json::from_str(r#"{"anchors": [{"id": 1, "href": "/feed"}]}"#).unwrap();
    let (report, _) = replay::run(&config, &trace).await.unwrap();

    assert_eq!(report.warmup_accepted, 0);
    assert!(report.prefetched.is_empty());
    assert_eq!(report.observed_links, 1);
}

#[tokio::test(start_paused = true)]
async fn test_replay_rejects_bad_origin() {
    let config = Config {
        origin: "not a url".into(),
        ..Default::default()
    };
    let result = replay::run(&config, &Trace::default()).await;
    assert!(matches!(result, Err(PrefetchError::InvalidOrigin { .. })));
}

#[test]
fn test_trace_load_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(LOW_END_TRACE.as_bytes()).unwrap();

    let trace = Trace::load(file.path()).unwrap();
    assert_eq!(trace.anchors.len(), 3);
    assert_eq!(trace.events.len(), 6);
    assert_eq!(trace.device.hardware_concurrency, Some(2));
}

#[test]
fn test_config_load_partial_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(
        br#"{"origin": "https://label.example", "cache": {"capacity": null}, "queue": {"tick_fallback_ms": 300}}"#,
    )
    .unwrap();

    let config = Config::load(file.path()).unwrap();
    assert_eq!(config.origin, "https://label.example");
    assert_eq!(config.cache.capacity, None);
    assert_eq!(config.queue.tick_fallback_ms, 300);
    // Untouched sections keep their defaults.
    assert_eq!(config.queue.idle_timeout_ms, 2000);
    assert_eq!(config.observer.rescan_throttle_ms, 750);
}

#[test]
fn test_config_load_missing_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::load(&dir.path().join("absent.json")).unwrap();
    assert_eq!(config.cache.capacity, Some(50));
}

#[test]
fn test_config_load_rejects_invalid_values() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(br#"{"queue": {"tick_fallback_ms": 0}}"#).unwrap();

    let result = Config::load(file.path());
    assert!(matches!(result, Err(PrefetchError::Config(_))));
}

#[test]
fn test_config_load_rejects_zero_cache_capacity() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(br#"{"cache": {"capacity": 0}}"#).unwrap();

    let result = Config::load(file.path());
    assert!(matches!(result, Err(PrefetchError::Config(_))));
}
