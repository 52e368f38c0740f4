//! Submission observers and the simulated upload progress tracker.
//!
//! Inject an [`Arc<dyn SubmissionObserver>`] via
//! [`crate::Orchestrator::with_observer`] to receive state changes, progress
//! ticks, results and errors as a submission runs.
//!
//! # Simulated progress
//!
//! The service reports nothing while it works, so upload modes show a
//! synthetic bar: +`progress_step` every `tick_interval_ms`, held at
//! `progress_cap` until the dispatcher settles. Success jumps to 100 and
//! drops back to 0 after `success_display_ms`; failure drops to 0 at once.
//!
//! The ticking task is owned by a [`TickGuard`]. Settling the guard, or
//! dropping it on any other exit path, stops the ticks. A `ticking` flag
//! checked under the same lock as the value makes a tick that was already
//! running when the guard settled a no-op, so the bar can never move after
//! the call has settled.
//!
//! # Example
//!
//! ```rust
//! use nocap::{SubmissionObserver, SubmissionState, AnalysisMode};
//! use std::sync::{Arc, atomic::{AtomicU8, Ordering}};
//!
//! struct LastPercent(AtomicU8);
//!
//! impl SubmissionObserver for LastPercent {
//!     fn on_progress(&self, percent: u8) {
//!         self.0.store(percent, Ordering::SeqCst);
//!     }
//! }
//!
//! let obs: Arc<dyn SubmissionObserver> = Arc::new(LastPercent(AtomicU8::new(0)));
//! obs.on_state_change(AnalysisMode::Image, SubmissionState::Submitting);
//! ```

use crate::config::ClientConfig;
use crate::error::NoCapError;
use crate::mode::AnalysisMode;
use crate::orchestrator::SubmissionState;
use crate::output::AnalysisResult;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

/// Called by the orchestrator as a submission progresses.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. `on_progress` is invoked while the tracker's lock
/// is held, which keeps the reported sequence monotonic; implementations
/// must not call back into the tracker.
pub trait SubmissionObserver: Send + Sync {
    fn on_state_change(&self, mode: AnalysisMode, state: SubmissionState) {
        let _ = (mode, state);
    }

    /// New progress percentage in `0..=100`.
    fn on_progress(&self, percent: u8) {
        let _ = percent;
    }

    fn on_result(&self, result: &AnalysisResult) {
        let _ = result;
    }

    fn on_error(&self, error: &NoCapError) {
        let _ = error;
    }
}

/// A no-op implementation for callers that don't need events.
pub struct NoopObserver;

impl SubmissionObserver for NoopObserver {}

/// Convenience alias for the observer stored by the orchestrator.
pub type Observer = Arc<dyn SubmissionObserver>;

#[derive(Debug, Default)]
struct Inner {
    /// Bumped on every start/reset so stale timers can tell they're stale.
    generation: u64,
    value: u8,
    ticking: bool,
}

/// Shared progress value with generation-checked updates.
#[derive(Clone)]
pub struct ProgressTracker {
    inner: Arc<Mutex<Inner>>,
    observer: Observer,
}

impl ProgressTracker {
    pub fn new(observer: Observer) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            observer,
        }
    }

    /// Current percentage.
    pub fn value(&self) -> u8 {
        self.lock().value
    }

    /// Reset to 0 and start ticking for a new submission.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self, config: &ClientConfig) -> TickGuard {
        let generation = {
            let mut inner = self.lock();
            inner.generation += 1;
            inner.ticking = true;
            self.set(&mut inner, 0);
            inner.generation
        };

        let period = config.tick_interval();
        let step = config.progress_step;
        let cap = config.progress_cap;
        let tracker = self.clone();

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // The first tick completes immediately.
            interval.tick().await;
            loop {
                interval.tick().await;
                if !tracker.advance(generation, step, cap) {
                    break;
                }
            }
        });

        debug!("Progress ticking (generation {})", generation);
        TickGuard {
            tracker: self.clone(),
            generation,
            handle: Some(handle),
        }
    }

    /// Drop straight to 0, invalidating any pending timer.
    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.generation += 1;
        inner.ticking = false;
        self.set(&mut inner, 0);
    }

    /// One tick. Returns `false` once ticking should stop.
    fn advance(&self, generation: u64, step: u8, cap: u8) -> bool {
        let mut inner = self.lock();
        if inner.generation != generation || !inner.ticking {
            return false;
        }
        let next = inner.value.saturating_add(step).min(cap).max(inner.value);
        self.set(&mut inner, next);
        next < cap
    }

    fn settle(&self, generation: u64, value: u8) {
        let mut inner = self.lock();
        if inner.generation == generation {
            inner.ticking = false;
            self.set(&mut inner, value);
        }
    }

    fn reset_if_current(&self, generation: u64) {
        let mut inner = self.lock();
        if inner.generation == generation {
            self.set(&mut inner, 0);
        }
    }

    fn set(&self, inner: &mut Inner, value: u8) {
        if inner.value != value {
            inner.value = value;
            self.observer.on_progress(value);
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Owns the ticking task for one submission.
///
/// Dropping an unsettled guard stops the ticks and resets progress to 0.
pub struct TickGuard {
    tracker: ProgressTracker,
    generation: u64,
    handle: Option<JoinHandle<()>>,
}

impl TickGuard {
    /// Dispatcher succeeded: show 100, then reset after `display`.
    pub fn succeed(mut self, display: Duration) {
        self.stop_ticking();
        self.tracker.settle(self.generation, 100);

        let tracker = self.tracker.clone();
        let generation = self.generation;
        tokio::spawn(async move {
            tokio::time::sleep(display).await;
            tracker.reset_if_current(generation);
        });
    }

    /// Dispatcher failed: back to 0 immediately.
    pub fn fail(mut self) {
        self.stop_ticking();
        self.tracker.settle(self.generation, 0);
    }

    fn stop_ticking(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            debug!("Progress ticking stopped (generation {})", self.generation);
        }
    }
}

impl Drop for TickGuard {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.stop_ticking();
            self.tracker.settle(self.generation, 0);
        }
    }
}
