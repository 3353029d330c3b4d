//! Runtime control of a running simulation.
//!
//! [`SimulationControl`] is shared (behind an [`Arc`](std::sync::Arc))
//! between the sweep loop and whoever wants to steer it: a Ctrl-C handler,
//! a test, or an embedding service. The loop reads the atomics on every
//! sweep without taking locks.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, Notify};

/// Why a simulation run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationEndReason {
    /// Completed the configured number of sweeps.
    MaxIterationsReached,
    /// Ran for the configured wall-clock time.
    MaxRealTimeReached,
    /// [`SimulationControl::request_stop`] was called.
    OperatorStop,
}

/// Shared stop / pause / speed state for a simulation run.
#[derive(Debug)]
pub struct SimulationControl {
    paused: AtomicBool,
    stop_requested: AtomicBool,
    /// Wakes the loop on resume or stop.
    wake: Notify,
    pause_ms: AtomicU64,
    started_at: DateTime<Utc>,
    /// Sweeps before stopping (0 = unlimited).
    max_iterations: u64,
    /// Wall-clock seconds before stopping (0 = unlimited).
    max_real_time_seconds: u64,
    end_reason: Mutex<Option<SimulationEndReason>>,
}

impl SimulationControl {
    /// Create control state with the given inter-sweep pause and limits.
    pub fn new(pause_ms: u64, max_iterations: u64, max_real_time_seconds: u64) -> Self {
        Self {
            paused: AtomicBool::new(false),
            stop_requested: AtomicBool::new(false),
            wake: Notify::new(),
            pause_ms: AtomicU64::new(pause_ms),
            started_at: Utc::now(),
            max_iterations,
            max_real_time_seconds,
            end_reason: Mutex::new(None),
        }
    }

    /// Control state with no pause and no limits.
    pub fn unbounded() -> Self {
        Self::new(0, 0, 0)
    }

    // -----------------------------------------------------------------------
    // Pause / Resume
    // -----------------------------------------------------------------------

    /// Whether the loop is paused.
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    /// Pause before the next sweep.
    pub fn pause(&self) {
        self.paused.store(true, Ordering::Release);
    }

    /// Resume and wake the loop.
    pub fn resume(&self) {
        self.paused.store(false, Ordering::Release);
        self.wake.notify_one();
    }

    /// Wait until the loop is no longer paused or a stop was requested.
    pub async fn wait_if_paused(&self) {
        while self.is_paused() && !self.is_stop_requested() {
            self.wake.notified().await;
        }
    }

    // -----------------------------------------------------------------------
    // Stop
    // -----------------------------------------------------------------------

    /// Ask the loop to stop. In-flight puts finish first.
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::Release);
        self.wake.notify_one();
    }

    /// Whether a stop was requested.
    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }

    /// Record why the run ended.
    pub async fn set_end_reason(&self, reason: SimulationEndReason) {
        *self.end_reason.lock().await = Some(reason);
    }

    /// Why the run ended, if it has.
    pub async fn end_reason(&self) -> Option<SimulationEndReason> {
        *self.end_reason.lock().await
    }

    // -----------------------------------------------------------------------
    // Pacing
    // -----------------------------------------------------------------------

    /// Current pause between sweeps, in milliseconds.
    pub fn pause_ms(&self) -> u64 {
        self.pause_ms.load(Ordering::Acquire)
    }

    /// Change the pause between sweeps. Returns the previous value.
    pub fn set_pause_ms(&self, ms: u64) -> u64 {
        self.pause_ms.swap(ms, Ordering::AcqRel)
    }

    /// Sleep for the current pause, returning early on a stop request.
    pub async fn sleep_between_sweeps(&self) {
        let ms = self.pause_ms();
        if ms == 0 || self.is_stop_requested() {
            return;
        }
        tokio::select! {
            () = tokio::time::sleep(Duration::from_millis(ms)) => {}
            () = self.wake.notified() => {}
        }
    }

    // -----------------------------------------------------------------------
    // Boundaries
    // -----------------------------------------------------------------------

    /// Whether `completed` sweeps satisfy the iteration limit.
    pub const fn iteration_limit_reached(&self, completed: u64) -> bool {
        self.max_iterations > 0 && completed >= self.max_iterations
    }

    /// Whether the wall-clock limit has passed.
    pub fn time_limit_reached(&self) -> bool {
        self.max_real_time_seconds > 0 && self.elapsed_seconds() >= self.max_real_time_seconds
    }

    /// When the run started.
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Seconds since the run started.
    pub fn elapsed_seconds(&self) -> u64 {
        let elapsed = Utc::now()
            .signed_duration_since(self.started_at)
            .num_seconds();
        // Clock steps backwards count as zero.
        u64::try_from(elapsed.max(0)).unwrap_or(u64::MAX)
    }

    /// Configured sweep limit.
    pub const fn max_iterations(&self) -> u64 {
        self.max_iterations
    }

    /// Configured wall-clock limit.
    pub const fn max_real_time_seconds(&self) -> u64 {
        self.max_real_time_seconds
    }
}
