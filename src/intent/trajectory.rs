//! Mouse trajectory prediction.
//!
//! Extrapolates the pointer a few deltas ahead and prefetches the link
//! found there when the pointer moves fast enough to suggest a deliberate
//! reach. Only the latest prediction is kept.

use tokio::time::Instant;

use crate::config::IntentConfig;
use crate::dom::{Document, Point};
use crate::intent::{IntentKind, PrefetchCandidate, TRAJECTORY_PRIORITY};
use crate::route::{NormalizedPath, UrlNormalizer};

/// The most recent trajectory prediction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MouseIntent {
    pub target_url: Option<NormalizedPath>,
    /// 0.0 - 1.0
    pub confidence: f64,
    pub timestamp: Option<Instant>,
}

#[derive(Debug)]
pub struct TrajectoryPredictor {
    config: IntentConfig,
    last_pos: Option<Point>,
    intent: MouseIntent,
}

impl TrajectoryPredictor {
    pub fn new(config: IntentConfig) -> Self {
        Self {
            config,
            last_pos: None,
            intent: MouseIntent::default(),
        }
    }

    pub fn intent(&self) -> &MouseIntent {
        &self.intent
    }

    /// Feed one pointer position. Returns a candidate when the predicted
    /// point lands on an internal link with enough confidence.
    pub fn observe(
        &mut self,
        pos: Point,
        now: Instant,
        document: &dyn Document,
        normalizer: &UrlNormalizer,
    ) -> Option<PrefetchCandidate> {
        let last = self.last_pos.replace(pos)?;
        let dx = pos.x - last.x;
        let dy = pos.y - last.y;

        let speed = dx.hypot(dy);
        if speed < self.config.min_speed {
            return None;
        }

        let predicted = Point::new(
            pos.x + dx * self.config.lookahead,
            pos.y + dy * self.config.lookahead,
        );
        let element = document.element_at(predicted)?;
        let anchor = document.closest_anchor(element)?;
        let url = normalizer.internal_path(&anchor.href)?;

        let confidence = (speed / self.config.confidence_divisor).min(1.0);
        self.intent = MouseIntent {
            target_url: Some(url.clone()),
            confidence,
            timestamp: Some(now),
        };

        if confidence > self.config.min_confidence {
            Some(
                PrefetchCandidate::new(url, IntentKind::Trajectory)
                    .with_priority(TRAJECTORY_PRIORITY * confidence),
            )
        } else {
            None
        }
    }
}
