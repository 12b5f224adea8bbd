//! Pause-aware elapsed-time tracking

use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct ClockInner {
    accumulated: Duration,
    running_since: Option<Instant>,
}

/// Tracks how much audible time a capture has accumulated.
///
/// Time advances only between `start`/`resume` and the next `pause`/`halt`,
/// so paused intervals never count toward the total. Interior mutability lets
/// capture backends share one clock between their control path and the task
/// that publishes elapsed-time updates.
#[derive(Debug, Default)]
pub struct PauseAwareClock {
    inner: Mutex<ClockInner>,
}

impl PauseAwareClock {
    /// Create a stopped clock with no accumulated time
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin counting. No-op if already running.
    pub fn start(&self) {
        let mut inner = self.lock();
        if inner.running_since.is_none() {
            inner.running_since = Some(Instant::now());
        }
    }

    /// Stop counting, folding the running interval into the total
    pub fn pause(&self) {
        let mut inner = self.lock();
        if let Some(since) = inner.running_since.take() {
            inner.accumulated += since.elapsed();
        }
    }

    /// Resume counting after a pause. No-op if already running.
    pub fn resume(&self) {
        self.start();
    }

    /// Permanently freeze the clock and return the final total
    pub fn halt(&self) -> Duration {
        self.pause();
        self.elapsed()
    }

    /// Audible time accumulated so far
    pub fn elapsed(&self) -> Duration {
        let inner = self.lock();
        match inner.running_since {
            Some(since) => inner.accumulated + since.elapsed(),
            None => inner.accumulated,
        }
    }

    /// Audible time accumulated so far, in milliseconds
    pub fn elapsed_millis(&self) -> u64 {
        self.elapsed().as_millis() as u64
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ClockInner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
