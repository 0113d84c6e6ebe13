//! Live per-worker counters and response-time smoothing.
//!
//! One record exists per registered worker, each behind its own
//! `parking_lot::Mutex` so increment/decrement and the moving-average
//! update stay atomic under real OS threads. Critical sections are a few
//! loads and stores; nothing async happens under a lock.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::core::{CapabilityTable, OrchestratorError};

/// Weight of the prior average in the response-time EMA.
const EMA_RETAIN: f64 = 0.8;
/// Weight of the newest sample in the response-time EMA.
const EMA_SAMPLE: f64 = 0.2;

/// Live counters for one worker.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkerStats {
    /// Tasks currently dispatched to this worker. Never negative; must not
    /// exceed the worker's `max_concurrent` under correct operation.
    pub active_tasks: u32,
    /// Completed attempts, success or failure. Monotonic.
    pub total_tasks: u64,
    /// Failed attempts. Monotonic, always `<= total_tasks`.
    pub error_count: u64,
    /// Exponentially smoothed response time; `0` until the first completion.
    pub avg_response_time_ms: f64,
}

impl WorkerStats {
    /// Fraction of attempts that failed; `0` before any attempt.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn error_rate(&self) -> f64 {
        if self.total_tasks == 0 {
            0.0
        } else {
            self.error_count as f64 / self.total_tasks as f64
        }
    }
}

/// Fold one response-time sample into the running average.
///
/// The first sample is taken verbatim; afterwards
/// `new = round(old * 0.8 + sample * 0.2)`.
fn smoothed(prev: f64, sample: f64) -> f64 {
    if prev == 0.0 {
        sample
    } else {
        (prev * EMA_RETAIN + sample * EMA_SAMPLE).round()
    }
}

/// Tracks live stats for every registered worker.
///
/// The record set is fixed at construction; all mutation goes through
/// [`StatsTracker::begin_task`] and the settle operations, so
/// `active_tasks` can only leak if a begin is never paired — which the
/// [`InFlight`] guard makes impossible.
#[derive(Debug)]
pub struct StatsTracker {
    records: HashMap<String, Mutex<WorkerStats>>,
}

impl StatsTracker {
    /// Create a tracker with one zeroed record per worker id.
    pub fn new(worker_ids: impl IntoIterator<Item = String>) -> Self {
        Self {
            records: worker_ids
                .into_iter()
                .map(|id| (id, Mutex::new(WorkerStats::default())))
                .collect(),
        }
    }

    /// Create a tracker covering every worker in `table`.
    #[must_use]
    pub fn for_table(table: &CapabilityTable) -> Self {
        Self::new(table.ids().iter().cloned())
    }

    /// Mark one task as in flight on `worker_id`.
    ///
    /// Returns an RAII guard; exactly one of [`InFlight::succeed`] or
    /// [`InFlight::fail`] settles it, and dropping it unsettled (panic,
    /// cancellation) records a failure. Release happens on every exit path.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::UnknownWorker`] for an unregistered id.
    pub fn begin_task(self: &Arc<Self>, worker_id: &str) -> Result<InFlight, OrchestratorError> {
        let record = self.record(worker_id)?;
        record.lock().active_tasks += 1;
        Ok(InFlight {
            tracker: Arc::clone(self),
            worker_id: worker_id.to_string(),
            started: Instant::now(),
            settled: false,
        })
    }

    /// Record a successful completion: release the active slot, bump the
    /// completion counter, fold in the response time.
    pub fn record_success(&self, worker_id: &str, elapsed_ms: u64) {
        self.settle(worker_id, elapsed_ms, false);
    }

    /// Record a failed completion: release the active slot, bump completion
    /// and error counters, fold in the response time.
    pub fn record_failure(&self, worker_id: &str, elapsed_ms: u64) {
        self.settle(worker_id, elapsed_ms, true);
    }

    /// Read-only copy of one worker's counters.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::UnknownWorker`] for an unregistered id.
    pub fn snapshot(&self, worker_id: &str) -> Result<WorkerStats, OrchestratorError> {
        Ok(self.record(worker_id)?.lock().clone())
    }

    /// Snapshot of every worker's counters.
    #[must_use]
    pub fn snapshot_all(&self) -> HashMap<String, WorkerStats> {
        self.records
            .iter()
            .map(|(id, record)| (id.clone(), record.lock().clone()))
            .collect()
    }

    fn settle(&self, worker_id: &str, elapsed_ms: u64, failed: bool) {
        let Ok(record) = self.record(worker_id) else {
            // Unpaired settle for an unknown id; nothing to release.
            return;
        };
        let mut stats = record.lock();
        stats.active_tasks = stats.active_tasks.saturating_sub(1);
        stats.total_tasks += 1;
        if failed {
            stats.error_count += 1;
        }
        #[allow(clippy::cast_precision_loss)]
        let sample = elapsed_ms as f64;
        stats.avg_response_time_ms = smoothed(stats.avg_response_time_ms, sample);
    }

    fn record(&self, worker_id: &str) -> Result<&Mutex<WorkerStats>, OrchestratorError> {
        self.records
            .get(worker_id)
            .ok_or_else(|| OrchestratorError::UnknownWorker(worker_id.to_string()))
    }
}

/// RAII handle for one in-flight task attempt.
///
/// Holds the active-task slot acquired by [`StatsTracker::begin_task`].
/// Dropping without settling counts as a failure, so a cancelled or
/// panicking execution can never leave the worker's active count inflated.
#[must_use = "dropping an unsettled InFlight records a failure"]
#[derive(Debug)]
pub struct InFlight {
    tracker: Arc<StatsTracker>,
    worker_id: String,
    started: Instant,
    settled: bool,
}

impl InFlight {
    /// Milliseconds since the task was dispatched.
    #[must_use]
    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    /// Settle as a success; returns the measured execution time.
    pub fn succeed(mut self) -> u64 {
        let elapsed = self.elapsed_ms();
        self.settled = true;
        self.tracker.record_success(&self.worker_id, elapsed);
        elapsed
    }

    /// Settle as a failure; returns the measured execution time.
    pub fn fail(mut self) -> u64 {
        let elapsed = self.elapsed_ms();
        self.settled = true;
        self.tracker.record_failure(&self.worker_id, elapsed);
        elapsed
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if !self.settled {
            self.tracker
                .record_failure(&self.worker_id, self.elapsed_ms());
        }
    }
}
