//! Device capability classification.
//!
//! Low-end devices get their weak-intent prefetches queued and drained one
//! at a time instead of fired immediately. The classification is computed
//! once when a scheduler is built and never revisited.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::DeviceConfig;

/// Raw hardware hints as reported by the host (`navigator.*`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceSignals {
    /// Logical core count; `None` when the API is missing.
    pub hardware_concurrency: Option<u32>,

    /// Approximate device memory in GB; `None` when the API is missing.
    pub device_memory_gb: Option<f64>,

    /// User agent string.
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeviceProfile {
    pub is_low_end: bool,
}

impl DeviceProfile {
    pub const LOW_END: DeviceProfile = DeviceProfile { is_low_end: true };
    pub const HIGH_END: DeviceProfile = DeviceProfile { is_low_end: false };

    /// Classify a device from its signals.
    ///
    /// Missing signals never make a device low-end. A reported core count
    /// of zero is treated as missing.
    pub fn classify(signals: &DeviceSignals, config: &DeviceConfig) -> Self {
        let few_cores = signals
            .hardware_concurrency
            .filter(|&cores| cores > 0)
            .is_some_and(|cores| cores <= config.low_end_cores);

        let little_memory = signals
            .device_memory_gb
            .filter(|mem| mem.is_finite() && *mem > 0.0)
            .is_some_and(|mem| mem <= config.low_end_memory_gb);

        let mobile_ua = config.mobile_user_agent_is_low_end
            && signals
                .user_agent
                .as_deref()
                .is_some_and(is_android_chrome_mobile);

        Self {
            is_low_end: few_cores || little_memory || mobile_ua,
        }
    }
}

/// The low-end user-agent heuristic: Android Chrome on a phone.
static ANDROID_CHROME_MOBILE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Android.*Chrome/[.0-9]* Mobile")
        .expect("ANDROID_CHROME_MOBILE: hardcoded regex is valid")
});

fn is_android_chrome_mobile(user_agent: &str) -> bool {
    ANDROID_CHROME_MOBILE.is_match(user_agent)
}
