//! Intent signals and the candidates they produce.
//!
//! - [`throttle`]: leading-edge throttle shared by the detectors
//! - [`detectors`]: hover, touch-start, focus and pointer-down handlers
//! - [`trajectory`]: mouse trajectory prediction

pub mod detectors;
pub mod throttle;
pub mod trajectory;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::route::NormalizedPath;

pub use detectors::IntentDetectors;
pub use throttle::{Throttle, ThrottleState};
pub use trajectory::{MouseIntent, TrajectoryPredictor};

/// Highest priority, used by hover and touch-start.
pub const MAX_PRIORITY: f64 = 100.0;

/// Lowest priority, used by viewport intersection.
pub const MIN_PRIORITY: f64 = 1.0;

/// Keyboard focus and mouse-down, just below hover.
pub const EXPLICIT_PRIORITY: f64 = 90.0;

/// Trajectory priority at full confidence.
pub const TRAJECTORY_PRIORITY: f64 = 50.0;

pub const WARMUP_PRIORITY: f64 = 10.0;

/// Where a candidate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    Hover,
    TouchStart,
    Focus,
    PointerDown,
    Viewport,
    Trajectory,
    Warmup,
}

impl IntentKind {
    /// Priority a candidate of this kind gets unless overridden.
    pub fn default_priority(&self) -> f64 {
        match self {
            IntentKind::Hover | IntentKind::TouchStart => MAX_PRIORITY,
            IntentKind::Focus | IntentKind::PointerDown => EXPLICIT_PRIORITY,
            IntentKind::Trajectory => TRAJECTORY_PRIORITY,
            IntentKind::Warmup => WARMUP_PRIORITY,
            IntentKind::Viewport => MIN_PRIORITY,
        }
    }

    /// Strong intents are issued immediately on every device class.
    pub fn is_strong(&self) -> bool {
        matches!(
            self,
            IntentKind::Hover | IntentKind::TouchStart | IntentKind::Focus | IntentKind::PointerDown
        )
    }
}

impl fmt::Display for IntentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntentKind::Hover => write!(f, "hover"),
            IntentKind::TouchStart => write!(f, "touch_start"),
            IntentKind::Focus => write!(f, "focus"),
            IntentKind::PointerDown => write!(f, "pointer_down"),
            IntentKind::Viewport => write!(f, "viewport"),
            IntentKind::Trajectory => write!(f, "trajectory"),
            IntentKind::Warmup => write!(f, "warmup"),
        }
    }
}

/// A proposed prefetch. Consumed once by the scheduler.
#[derive(Debug, Clone, PartialEq)]
pub struct PrefetchCandidate {
    pub url: NormalizedPath,
    pub priority: f64,
    pub source: IntentKind,
}

impl PrefetchCandidate {
    pub fn new(url: NormalizedPath, source: IntentKind) -> Self {
        Self {
            url,
            priority: source.default_priority(),
            source,
        }
    }

    pub fn with_priority(mut self, priority: f64) -> Self {
        self.priority = priority;
        self
    }
}
