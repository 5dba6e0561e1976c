//! Leading-edge throttle.
//!
//! The first call in a window runs; later calls inside the same window are
//! dropped. Callers that must not lose the last event (the mutation
//! rescan) use [`Throttle::check`] to learn how long to wait and schedule a
//! trailing run themselves.

use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleState {
    Ready,
    Suppressed { remaining: Duration },
}

pub struct Throttle<F> {
    interval: Duration,
    last_run: Option<Instant>,
    callback: F,
}

impl<F> Throttle<F> {
    pub fn new(interval: Duration, callback: F) -> Self {
        Self {
            interval,
            last_run: None,
            callback,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn check(&self, now: Instant) -> ThrottleState {
        match self.last_run {
            Some(last) => {
                let elapsed = now.saturating_duration_since(last);
                if elapsed >= self.interval {
                    ThrottleState::Ready
                } else {
                    ThrottleState::Suppressed {
                        remaining: self.interval - elapsed,
                    }
                }
            }
            None => ThrottleState::Ready,
        }
    }

    /// Run the callback if the window allows it.
    pub fn call<A, R>(&mut self, arg: A) -> Option<R>
    where
        F: FnMut(A) -> R,
    {
        self.call_at(Instant::now(), arg)
    }

    pub fn call_at<A, R>(&mut self, now: Instant, arg: A) -> Option<R>
    where
        F: FnMut(A) -> R,
    {
        match self.check(now) {
            ThrottleState::Ready => {
                self.last_run = Some(now);
                Some((self.callback)(arg))
            }
            ThrottleState::Suppressed { .. } => None,
        }
    }

    /// Forget the last run so the next call goes through.
    pub fn reset(&mut self) {
        self.last_run = None;
    }
}

impl<F> std::fmt::Debug for Throttle<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Throttle")
            .field("interval", &self.interval)
            .field("last_run", &self.last_run)
            .finish_non_exhaustive()
    }
}
