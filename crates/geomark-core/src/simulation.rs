//! The simulation engine: seeds a population and keeps it moving.
//!
//! Each sweep dispatches one task per marker. A task takes one random-walk
//! step for its marker and pushes the result through the [`MarkerSink`].
//! Dispatch is throttled by a semaphore sized to the configured
//! concurrency; with the default of 1, a task must finish before the next
//! one is dispatched, so puts within a sweep are strictly sequential.
//!
//! Tasks only ever write back to their own marker's entry in the
//! [`WorkingSet`], so a larger throttle never races on shared state.
//!
//! A failed put (after retries) stops the sweep: no further tasks are
//! dispatched, outstanding ones are drained, and the first error is
//! returned. Markers are never silently dropped.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use geomark_types::{Geofence, Marker, MarkerId};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, info, warn};

use crate::config::SimulationConfig;
use crate::control::{SimulationControl, SimulationEndReason};
use crate::population::{self, Roster, WorkingSet};
use crate::sink::{MarkerSink, RetryPolicy, SinkError};
use crate::walk;

/// Errors that stop a simulation run.
#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    /// A put kept failing after every retry.
    #[error("put for marker {id} failed: {source}")]
    Put {
        /// The marker whose update was lost.
        id: MarkerId,
        /// The last sink error.
        source: SinkError,
    },

    /// The startup reset failed.
    #[error("reset failed: {source}")]
    Reset {
        /// The last sink error.
        source: SinkError,
    },

    /// No usable names to draw from.
    #[error("name roster is empty")]
    EmptyRoster,

    /// The throttle would never let a task through.
    #[error("concurrency must be at least 1")]
    ZeroConcurrency,

    /// A dispatched task panicked or was cancelled.
    #[error("sweep task failed: {0}")]
    Task(String),
}

impl From<JoinError> for SimulationError {
    fn from(e: JoinError) -> Self {
        Self::Task(e.to_string())
    }
}

/// Statistics for one completed sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepSummary {
    /// 1-based sweep number.
    pub iteration: u64,
    /// Markers whose put succeeded in this sweep.
    pub markers_moved: usize,
    /// Most tasks observed in flight at once.
    pub peak_in_flight: usize,
    /// Wall-clock duration of the sweep.
    pub elapsed: Duration,
}

/// Outcome of [`SimulationEngine::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationResult {
    /// Why the run ended.
    pub end_reason: SimulationEndReason,
    /// Sweeps started, including one cut short by a stop request.
    pub total_sweeps: u64,
    /// The last sweep's statistics, if any ran.
    pub last_sweep: Option<SweepSummary>,
}

// ---------------------------------------------------------------------------
// In-flight probe
// ---------------------------------------------------------------------------

/// Counts tasks currently between dispatch and completion.
#[derive(Debug, Default)]
pub struct InFlightProbe {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl InFlightProbe {
    /// Mark one task as in flight until the guard drops.
    pub fn enter(self: &Arc<Self>) -> InFlightGuard {
        let now = self.current.fetch_add(1, Ordering::AcqRel).saturating_add(1);
        self.peak.fetch_max(now, Ordering::AcqRel);
        InFlightGuard {
            probe: Arc::clone(self),
        }
    }

    /// Tasks in flight right now.
    pub fn current(&self) -> usize {
        self.current.load(Ordering::Acquire)
    }

    /// Highest in-flight count since the last [`reset_peak`](Self::reset_peak).
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::Acquire)
    }

    /// Start a new peak measurement window.
    pub fn reset_peak(&self) {
        self.peak.store(self.current(), Ordering::Release);
    }
}

/// Decrements the in-flight count on drop.
#[derive(Debug)]
pub struct InFlightGuard {
    probe: Arc<InFlightProbe>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.probe.current.fetch_sub(1, Ordering::AcqRel);
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

type TaskOutput = (MarkerId, Result<Marker, SinkError>);

/// Drives the random walk for a population of markers.
#[derive(Debug)]
pub struct SimulationEngine<S> {
    sink: Arc<S>,
    fence: Geofence,
    step: f64,
    concurrency: usize,
    retry: RetryPolicy,
    rng: StdRng,
    probe: Arc<InFlightProbe>,
}

impl<S: MarkerSink> SimulationEngine<S> {
    /// Build an engine from the simulation config.
    ///
    /// Uses `config.seed` when present, otherwise a fresh OS seed.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::ZeroConcurrency`] if the throttle is 0.
    pub fn new(sink: Arc<S>, config: &SimulationConfig) -> Result<Self, SimulationError> {
        if config.concurrency == 0 {
            return Err(SimulationError::ZeroConcurrency);
        }
        let rng = config
            .seed
            .map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);
        Ok(Self {
            sink,
            fence: config.geofence,
            step: config.step,
            concurrency: config.concurrency,
            retry: RetryPolicy {
                max_retries: config.max_retries,
                backoff: Duration::from_millis(config.retry_backoff_ms),
            },
            rng,
            probe: Arc::new(InFlightProbe::default()),
        })
    }

    /// The shared in-flight probe.
    pub const fn probe(&self) -> &Arc<InFlightProbe> {
        &self.probe
    }

    /// The sink updates are pushed to.
    pub const fn sink(&self) -> &Arc<S> {
        &self.sink
    }

    /// Clear the store, retrying per the engine's policy.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::Reset`] if every attempt fails.
    pub async fn reset_store(&self) -> Result<(), SimulationError> {
        self.retry
            .run("reset", || self.sink.reset())
            .await
            .map_err(|source| SimulationError::Reset { source })?;
        info!("Marker store reset");
        Ok(())
    }

    /// Generate `count` markers and put each one, returning the stored
    /// records as the working set.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::Put`] if a put fails after retries.
    pub async fn populate(
        &mut self,
        count: usize,
        roster: &Roster,
    ) -> Result<WorkingSet, SimulationError> {
        let markers = population::generate(count, &self.fence, roster, &mut self.rng);
        let mut set = WorkingSet::new();
        for marker in markers {
            let stored = self
                .retry
                .run("put", || self.sink.put(marker.clone()))
                .await
                .map_err(|source| SimulationError::Put {
                    id: marker.id.clone(),
                    source,
                })?;
            set.insert(stored);
        }
        info!(count = set.len(), "Population seeded");
        Ok(set)
    }

    /// Advance every marker in `set` by one step.
    ///
    /// Stops dispatching early if `control` requests a stop; markers not
    /// yet dispatched keep their old position.
    ///
    /// # Errors
    ///
    /// Returns the first [`SimulationError`] raised by a task. Results of
    /// tasks that succeeded are still written back to `set`.
    pub async fn sweep(
        &mut self,
        set: &mut WorkingSet,
        iteration: u64,
        control: &SimulationControl,
    ) -> Result<SweepSummary, SimulationError> {
        let started = Instant::now();
        self.probe.reset_peak();

        let throttle = Arc::new(Semaphore::new(self.concurrency));
        // Raised by a failing task before it releases its permit, so the
        // next acquire always observes it.
        let failed = Arc::new(AtomicBool::new(false));
        let mut tasks: JoinSet<TaskOutput> = JoinSet::new();
        let mut moved: usize = 0;
        let mut failure: Option<SimulationError> = None;

        let snapshot: Vec<Marker> = set.iter().cloned().collect();
        for marker in snapshot {
            if control.is_stop_requested() {
                debug!(iteration, "Stop requested mid-sweep");
                break;
            }

            let permit = Arc::clone(&throttle)
                .acquire_owned()
                .await
                .map_err(|e| SimulationError::Task(e.to_string()))?;

            while let Some(joined) = tasks.try_join_next() {
                absorb(joined, set, &mut moved, &mut failure);
            }
            if failure.is_some() || failed.load(Ordering::Acquire) {
                break;
            }

            let sink = Arc::clone(&self.sink);
            let probe = Arc::clone(&self.probe);
            let retry = self.retry;
            let failed = Arc::clone(&failed);
            let fence = self.fence;
            let delta = self.step;
            let mut rng = StdRng::from_rng(&mut self.rng);

            tasks.spawn(async move {
                let _permit = permit;
                // Dropped before the permit, so the probe never sees more
                // tasks than the throttle admits.
                let _in_flight = probe.enter();

                let next = marker.moved_to(walk::step(marker.coordinates, &fence, delta, &mut rng));
                let result = retry.run("put", || sink.put(next.clone())).await;
                if result.is_err() {
                    failed.store(true, Ordering::Release);
                }
                (marker.id, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            absorb(joined, set, &mut moved, &mut failure);
        }
        if let Some(e) = failure {
            return Err(e);
        }

        Ok(SweepSummary {
            iteration,
            markers_moved: moved,
            peak_in_flight: self.probe.peak(),
            elapsed: started.elapsed(),
        })
    }

    /// Sweep repeatedly until a limit is hit or a stop is requested.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError`] if a sweep fails.
    pub async fn run(
        &mut self,
        set: &mut WorkingSet,
        control: &Arc<SimulationControl>,
    ) -> Result<SimulationResult, SimulationError> {
        let mut last_sweep: Option<SweepSummary> = None;
        let mut total_sweeps: u64 = 0;

        info!(
            markers = set.len(),
            concurrency = self.concurrency,
            step = self.step,
            pause_ms = control.pause_ms(),
            max_iterations = control.max_iterations(),
            max_real_time_seconds = control.max_real_time_seconds(),
            "Simulation starting"
        );

        loop {
            if control.is_paused() {
                info!("Simulation paused, waiting for resume...");
                control.wait_if_paused().await;
                info!("Simulation resumed");
            }

            if control.is_stop_requested() {
                info!("Stop requested");
                return finish(control, SimulationEndReason::OperatorStop, total_sweeps, last_sweep).await;
            }

            if control.time_limit_reached() {
                info!(
                    max_seconds = control.max_real_time_seconds(),
                    elapsed = control.elapsed_seconds(),
                    "Real-time limit reached"
                );
                return finish(control, SimulationEndReason::MaxRealTimeReached, total_sweeps, last_sweep).await;
            }

            let iteration = total_sweeps.saturating_add(1);
            let summary = self.sweep(set, iteration, control).await?;
            total_sweeps = iteration;
            debug!(
                iteration,
                moved = summary.markers_moved,
                peak_in_flight = summary.peak_in_flight,
                elapsed_ms = u64::try_from(summary.elapsed.as_millis()).unwrap_or(u64::MAX),
                "Sweep complete"
            );
            last_sweep = Some(summary);

            if control.iteration_limit_reached(total_sweeps) {
                info!(
                    sweeps = total_sweeps,
                    max_iterations = control.max_iterations(),
                    "Iteration limit reached"
                );
                return finish(control, SimulationEndReason::MaxIterationsReached, total_sweeps, last_sweep).await;
            }

            control.sleep_between_sweeps().await;
        }
    }
}

fn absorb(
    joined: Result<TaskOutput, JoinError>,
    set: &mut WorkingSet,
    moved: &mut usize,
    failure: &mut Option<SimulationError>,
) {
    match joined {
        Ok((_, Ok(stored))) => {
            set.insert(stored);
            *moved = moved.saturating_add(1);
        }
        Ok((id, Err(source))) => {
            warn!(id = %id, error = %source, "Marker update failed");
            failure.get_or_insert(SimulationError::Put { id, source });
        }
        Err(e) => {
            warn!(error = %e, "Sweep task failed");
            failure.get_or_insert(SimulationError::from(e));
        }
    }
}

async fn finish(
    control: &SimulationControl,
    end_reason: SimulationEndReason,
    total_sweeps: u64,
    last_sweep: Option<SweepSummary>,
) -> Result<SimulationResult, SimulationError> {
    control.set_end_reason(end_reason).await;
    Ok(SimulationResult {
        end_reason,
        total_sweeps,
        last_sweep,
    })
}

/// Log the outcome of a run.
pub fn log_simulation_end(result: &SimulationResult) {
    info!(
        reason = ?result.end_reason,
        total_sweeps = result.total_sweeps,
        last_moved = result.last_sweep.as_ref().map(|s| s.markers_moved),
        last_peak_in_flight = result.last_sweep.as_ref().map(|s| s.peak_in_flight),
        "Simulation ended"
    );
}
