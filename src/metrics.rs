//! Prometheus counters for one scheduler instance.
//!
//! Each scheduler owns its own registry labelled with its instance id, so
//! independent schedulers never collide on registration.

use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use uuid::Uuid;

use crate::error::Result;

#[derive(Clone)]
pub struct SchedulerMetrics {
    registry: Registry,
    pub submitted: IntCounter,
    pub issued: IntCounter,
    pub skipped: IntCounter,
    pub failed: IntCounter,
    pub queued: IntCounter,
    pub queue_depth: IntGauge,
}

impl SchedulerMetrics {
    pub fn new(instance_id: Uuid) -> Result<Self> {
        let labels = [("instance".to_string(), instance_id.to_string())]
            .into_iter()
            .collect();
        let registry = Registry::new_custom(Some("nav_prefetch".to_string()), Some(labels))?;

        let submitted = IntCounter::new("submitted_total", "Candidates offered to the scheduler")?;
        let issued = IntCounter::new("issued_total", "Prefetch calls handed to the router")?;
        let skipped = IntCounter::new(
            "skipped_total",
            "Candidates dropped because their path was cached or pending",
        )?;
        let failed = IntCounter::new("failed_total", "Prefetch calls the router rejected")?;
        let queued = IntCounter::new("queued_total", "Candidates deferred to the low-end queue")?;
        let queue_depth = IntGauge::new("queue_depth", "Candidates waiting in the low-end queue")?;

        registry.register(Box::new(submitted.clone()))?;
        registry.register(Box::new(issued.clone()))?;
        registry.register(Box::new(skipped.clone()))?;
        registry.register(Box::new(failed.clone()))?;
        registry.register(Box::new(queued.clone()))?;
        registry.register(Box::new(queue_depth.clone()))?;

        Ok(Self {
            registry,
            submitted,
            issued,
            skipped,
            failed,
            queued,
            queue_depth,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Render all metrics in the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}
