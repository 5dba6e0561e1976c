//! Router seam and the committed-navigation trigger.
//!
//! Prefetching is an optimization only: a plain click on an internal link
//! always navigates, whether or not its prefetch was issued, finished or
//! failed. Modified clicks are never intercepted.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::RouterError;
use crate::route::{LinkTarget, NormalizedPath, UrlNormalizer};
use crate::scheduler::PrefetchScheduler;

/// The application router.
pub trait Router: Send + Sync {
    /// Warm `path`. Fire-and-forget: errors are logged, never surfaced.
    fn prefetch(&self, path: &NormalizedPath) -> Result<(), RouterError>;

    /// Navigate to `href` (query and fragment preserved).
    fn push(&self, href: &str) -> Result<(), RouterError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MouseButton {
    #[default]
    Primary,
    Middle,
    Secondary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub meta: bool,
    pub shift: bool,
    pub alt: bool,
}

impl Modifiers {
    pub fn any(&self) -> bool {
        self.ctrl || self.meta || self.shift || self.alt
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClickEvent {
    pub button: MouseButton,
    pub modifiers: Modifiers,
}

impl ClickEvent {
    pub fn primary() -> Self {
        Self::default()
    }

    /// A primary-button click with no modifier keys held.
    pub fn is_plain(&self) -> bool {
        self.button == MouseButton::Primary && !self.modifiers.any()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClickOutcome {
    /// The router handled the navigation; the host should prevent the default action.
    Intercepted,
    /// Leave the click to the browser (new tab, external link, router failure).
    Default,
}

pub struct NavigationTrigger {
    scheduler: PrefetchScheduler,
    normalizer: UrlNormalizer,
    router: Arc<dyn Router>,

    /// Href of the navigation in flight, until the host reports it complete.
    in_flight: Mutex<Option<String>>,
}

impl NavigationTrigger {
    pub fn new(scheduler: PrefetchScheduler, normalizer: UrlNormalizer) -> Self {
        let router = scheduler.router();
        Self {
            scheduler,
            normalizer,
            router,
            in_flight: Mutex::new(None),
        }
    }

    /// Handle a click on a link pointing at `target`.
    pub fn on_click(&self, event: &ClickEvent, target: &LinkTarget) -> ClickOutcome {
        if !event.is_plain() {
            debug!(?event, "Modified click left to the browser");
            return ClickOutcome::Default;
        }

        let href = target.full_href();
        let Some(path) = self.normalizer.internal_path(&href) else {
            return ClickOutcome::Default;
        };

        // Best effort; the push below does not wait for it.
        self.scheduler.prefetch_now(path);

        match self.start(&href) {
            Ok(()) => ClickOutcome::Intercepted,
            Err(e) => {
                warn!(href = %href, error = %e, "Router push failed, falling back to browser navigation");
                ClickOutcome::Default
            }
        }
    }

    /// Programmatic navigation.
    pub fn navigate(&self, href: &str) -> Result<(), RouterError> {
        self.start(href)
    }

    /// The host finished rendering the destination page.
    pub fn complete_navigation(&self) {
        if let Some(href) = self.in_flight.lock().take() {
            debug!(href = %href, "Navigation complete");
        }
    }

    pub fn is_navigating(&self) -> bool {
        self.in_flight.lock().is_some()
    }

    /// Href of the navigation in flight, if any.
    pub fn target_url(&self) -> Option<String> {
        self.in_flight.lock().clone()
    }

    fn start(&self, href: &str) -> Result<(), RouterError> {
        self.router.push(href)?;
        info!(href, "Navigating");
        *self.in_flight.lock() = Some(href.to_string());
        Ok(())
    }
}

/// A router that records every call. Used by the replay CLI and tests.
#[derive(Debug, Default)]
pub struct RecordingRouter {
    prefetched: Mutex<Vec<NormalizedPath>>,
    pushed: Mutex<Vec<String>>,
    failing: Mutex<Vec<String>>,
}

impl RecordingRouter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make any later prefetch or push of `path` fail.
    pub fn fail_on(&self, path: &str) {
        self.failing.lock().push(path.to_string());
    }

    pub fn prefetched(&self) -> Vec<NormalizedPath> {
        self.prefetched.lock().clone()
    }

    pub fn prefetch_count(&self) -> usize {
        self.prefetched.lock().len()
    }

    pub fn pushed(&self) -> Vec<String> {
        self.pushed.lock().clone()
    }

    fn rejects(&self, path: &str) -> bool {
        self.failing.lock().iter().any(|p| p == path)
    }
}

impl Router for RecordingRouter {
    fn prefetch(&self, path: &NormalizedPath) -> Result<(), RouterError> {
        self.prefetched.lock().push(path.clone());
        if self.rejects(path.as_str()) {
            return Err(RouterError::NotFound(path.to_string()));
        }
        Ok(())
    }

    fn push(&self, href: &str) -> Result<(), RouterError> {
        if self.rejects(href) {
            return Err(RouterError::Unavailable(href.to_string()));
        }
        self.pushed.lock().push(href.to_string());
        Ok(())
    }
}
