//! Runtime configuration for nav-prefetch.
//!
//! Configuration can be loaded from a JSON file or constructed programmatically.
//! All scheduling knobs (cache size, device thresholds, tick cadence,
//! detector thresholds, observer margins, warmup routes) live here.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use serde::{Deserialize, Serialize};

use crate::cache::DEFAULT_CAPACITY;
use crate::error::{PrefetchError, Result};

/// Command-line arguments.
#[derive(Parser, Debug, Clone)]
#[command(name = "nav-prefetch", about = "Replay navigation traces through the prefetch scheduler")]
pub struct Cli {
    /// Path to configuration file (JSON).
    #[arg(short, long, default_value = "config.json")]
    pub config: PathBuf,

    /// Path to the interaction trace to replay (JSON).
    #[arg(short, long)]
    pub trace: PathBuf,

    /// Enable verbose logging.
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines.
    #[arg(long)]
    pub json_logs: bool,

    /// Print scheduler metrics in Prometheus text format after the report.
    #[arg(long)]
    pub metrics: bool,
}

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Origin of the page the scheduler runs in.
    pub origin: String,

    /// Prefetch cache sizing.
    pub cache: CacheConfig,

    /// Device classification thresholds.
    pub device: DeviceConfig,

    /// Low-end queue cadence.
    pub queue: QueueConfig,

    /// Intent detector tuning.
    pub intent: IntentConfig,

    /// DOM observation settings.
    pub observer: ObserverConfig,

    /// Critical-route warmup.
    pub warmup: WarmupConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            origin: "http://localhost:3000".to_string(),
            cache: CacheConfig::default(),
            device: DeviceConfig::default(),
            queue: QueueConfig::default(),
            intent: IntentConfig::default(),
            observer: ObserverConfig::default(),
            warmup: WarmupConfig::default(),
        }
    }
}

/// Prefetch cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum tracked paths (`null` = unbounded).
    pub capacity: Option<usize>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: Some(DEFAULT_CAPACITY),
        }
    }
}

/// Thresholds for the low-end device heuristic.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Core counts at or below this are low-end.
    pub low_end_cores: u32,

    /// Device memory (GB) at or below this is low-end.
    pub low_end_memory_gb: f64,

    /// Also classify Android Chrome Mobile user agents as low-end.
    pub mobile_user_agent_is_low_end: bool,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            low_end_cores: 4,
            low_end_memory_gb: 4.0,
            mobile_user_agent_is_low_end: false,
        }
    }
}

/// Drain cadence for the low-end priority queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Fixed delay between drains when no idle signal is available.
    pub tick_fallback_ms: u64,

    /// Upper bound on waiting for an idle signal.
    pub idle_timeout_ms: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            tick_fallback_ms: 150,
            idle_timeout_ms: 2000,
        }
    }
}

impl QueueConfig {
    pub fn tick_fallback(&self) -> Duration {
        Duration::from_millis(self.tick_fallback_ms)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }
}

/// Intent detector tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IntentConfig {
    /// Minimum interval between hover (and, separately, touch) evaluations.
    pub pointer_throttle_ms: u64,

    /// Pointer speed (px per event) below which trajectories are ignored.
    pub min_speed: f64,

    /// How many deltas ahead the predicted point lies.
    pub lookahead: f64,

    /// Speed at which confidence saturates at 1.0.
    pub confidence_divisor: f64,

    /// Confidence a trajectory must exceed to emit a candidate.
    pub min_confidence: f64,
}

impl Default for IntentConfig {
    fn default() -> Self {
        Self {
            pointer_throttle_ms: 50,
            min_speed: 2.0,
            lookahead: 3.0,
            confidence_divisor: 10.0,
            min_confidence: 0.3,
        }
    }
}

impl IntentConfig {
    pub fn pointer_throttle(&self) -> Duration {
        Duration::from_millis(self.pointer_throttle_ms)
    }
}

/// DOM observation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObserverConfig {
    /// Intersection margin beyond the viewport on low-end devices.
    pub margin_low_end_px: u32,

    /// Intersection margin beyond the viewport otherwise.
    pub margin_high_end_px: u32,

    /// Minimum interval between rescans triggered by DOM mutations.
    pub rescan_throttle_ms: u64,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            margin_low_end_px: 100,
            margin_high_end_px: 200,
            rescan_throttle_ms: 750,
        }
    }
}

impl ObserverConfig {
    pub fn margin_px(&self, is_low_end: bool) -> u32 {
        if is_low_end {
            self.margin_low_end_px
        } else {
            self.margin_high_end_px
        }
    }

    pub fn rescan_throttle(&self) -> Duration {
        Duration::from_millis(self.rescan_throttle_ms)
    }
}

/// Critical routes prefetched once after start-up.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WarmupConfig {
    pub enabled: bool,

    /// Routes to warm, in order.
    pub routes: Vec<String>,

    /// Delay between consecutive warmup submissions.
    pub stagger_ms: u64,

    /// Upper bound on waiting for the page to go idle before warming.
    pub idle_timeout_ms: u64,
}

impl Default for WarmupConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            routes: ["/feed", "/cabinet", "/news", "/auth"]
                .into_iter()
                .map(String::from)
                .collect(),
            stagger_ms: 50,
            idle_timeout_ms: 2000,
        }
    }
}

impl WarmupConfig {
    pub fn stagger(&self) -> Duration {
        Duration::from_millis(self.stagger_ms)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }
}

impl Config {
    /// Load configuration from a JSON file, falling back to defaults for missing fields.
    pub fn load(path: &std::path::Path) -> Result<Self> {
        if path.exists() {
            let data = std::fs::read_to_string(path)?;
            let config: Config = serde_json::from_str(&data)?;
            config.validate()?;
            Ok(config)
        } else {
            tracing::warn!("Config file not found at {:?}, using defaults", path);
            Ok(Config::default())
        }
    }

    /// Reject settings the scheduler cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.cache.capacity == Some(0) {
            return Err(PrefetchError::Config(
                "cache.capacity must be greater than zero (use null for unbounded)".into(),
            ));
        }
        if self.queue.tick_fallback_ms == 0 {
            return Err(PrefetchError::Config(
                "queue.tick_fallback_ms must be greater than zero".into(),
            ));
        }
        if self.queue.idle_timeout_ms == 0 {
            return Err(PrefetchError::Config(
                "queue.idle_timeout_ms must be greater than zero".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.intent.min_confidence) {
            return Err(PrefetchError::Config(format!(
                "intent.min_confidence must be within [0, 1], got {}",
                self.intent.min_confidence
            )));
        }
        if self.intent.confidence_divisor <= 0.0 {
            return Err(PrefetchError::Config(
                "intent.confidence_divisor must be positive".into(),
            ));
        }
        Ok(())
    }
}
