//! Deadline-bounded execution of a single task against a chosen worker.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::core::{
    CapabilityTable, DispatchAction, DispatchEvent, DispatchSink, LoadBalancer, OrchestratorError,
    StatsTracker, TaskFailure, TaskResult, TaskSpec, TaskPayload, WorkerConnector,
};

/// Shared handle to an optional dispatch-event sink.
pub(crate) type SharedDispatchLog = Arc<Mutex<Box<dyn DispatchSink>>>;

/// Executes one task: selection, stats bookkeeping, deadline, and the
/// single bounded fallback.
///
/// Execution-level failures (timeout, worker fault, malformed spec) are
/// always converted into a failed [`TaskResult`]; the only error this
/// component surfaces is selection-fatal
/// [`OrchestratorError::NoEligibleWorker`].
pub struct TaskExecutor<P, C>
where
    P: TaskPayload,
    C: WorkerConnector<P>,
{
    table: Arc<CapabilityTable>,
    stats: Arc<StatsTracker>,
    balancer: LoadBalancer,
    connector: Arc<C>,
    load_factor: f64,
    dispatch_log: Option<SharedDispatchLog>,
    _payload_marker: PhantomData<P>,
}

impl<P, C> TaskExecutor<P, C>
where
    P: TaskPayload,
    C: WorkerConnector<P>,
{
    /// Build an executor from shared components.
    pub(crate) fn new(
        table: Arc<CapabilityTable>,
        stats: Arc<StatsTracker>,
        balancer: LoadBalancer,
        connector: Arc<C>,
        load_factor: f64,
        dispatch_log: Option<SharedDispatchLog>,
    ) -> Self {
        Self {
            table,
            stats,
            balancer,
            connector,
            load_factor,
            dispatch_log,
            _payload_marker: PhantomData,
        }
    }

    /// Run one task to a result.
    ///
    /// Malformed specs and every execution-level failure come back as a
    /// failed [`TaskResult`]; this method never panics and never converts
    /// task trouble into an `Err`.
    ///
    /// # Errors
    ///
    /// Only [`OrchestratorError::NoEligibleWorker`], when the capability
    /// table is empty and nothing can be attempted.
    pub async fn execute(&self, spec: &TaskSpec<P>) -> Result<TaskResult, OrchestratorError> {
        if spec.timeout_secs == 0 {
            return Ok(TaskResult::rejected(
                spec.id,
                TaskFailure::InvalidSpec {
                    reason: "timeout_secs must be greater than zero".into(),
                },
            ));
        }

        // A forced worker bypasses scoring; the caller owns the load
        // consequences and gets no fallback.
        if let Some(forced) = &spec.preferred_worker {
            if !self.table.contains(forced) {
                tracing::warn!(task_id = %spec.id, worker = %forced, "preferred worker not registered");
                return Ok(TaskResult::rejected(
                    spec.id,
                    TaskFailure::InvalidSpec {
                        reason: format!("preferred worker `{forced}` is not registered"),
                    },
                ));
            }
            return Ok(self.attempt(spec, forced).await);
        }

        let candidates = self.balancer.eligible(&spec.task_type);
        let chosen =
            self.balancer
                .select_worker(&spec.task_type, spec.complexity, self.load_factor)?;

        let first = self.attempt(spec, &chosen).await;
        if first.success {
            return Ok(first);
        }

        // Single bounded fallback: one retry against the next candidate in
        // preference order, if the list has one.
        let Some(next) = next_candidate(&candidates, &chosen) else {
            return Ok(first);
        };
        tracing::debug!(
            task_id = %spec.id,
            failed = %chosen,
            retrying_on = %next,
            "first attempt failed, trying next candidate"
        );
        self.record(spec.id, next, DispatchAction::Fallback, Some(format!("after {chosen}")));
        Ok(self.attempt(spec, next).await)
    }

    /// One attempt against one worker, with guaranteed stats release.
    async fn attempt(&self, spec: &TaskSpec<P>, worker_id: &str) -> TaskResult {
        let in_flight = match self.stats.begin_task(worker_id) {
            Ok(guard) => guard,
            Err(err) => {
                // Candidates are resolved against the table, so this is
                // unreachable in practice; fail the task, not the batch.
                return TaskResult::rejected(
                    spec.id,
                    TaskFailure::InvalidSpec {
                        reason: err.to_string(),
                    },
                );
            }
        };

        self.record(spec.id, worker_id, DispatchAction::Dispatched, None);
        tracing::debug!(
            task_id = %spec.id,
            worker = worker_id,
            task_type = %spec.task_type,
            complexity = ?spec.complexity,
            timeout_secs = spec.timeout_secs,
            "dispatching task"
        );

        let limit = Duration::from_secs(spec.timeout_secs);
        let outcome = tokio::time::timeout(
            limit,
            self.connector.execute(&spec.payload, worker_id, limit),
        )
        .await;

        match outcome {
            Ok(Ok(payload)) => {
                let elapsed = in_flight.succeed();
                self.record(spec.id, worker_id, DispatchAction::Completed, None);
                tracing::debug!(task_id = %spec.id, worker = worker_id, elapsed_ms = elapsed, "task completed");
                TaskResult::completed(spec.id, worker_id, payload, elapsed)
            }
            Ok(Err(fault)) => {
                let elapsed = in_flight.fail();
                self.record(
                    spec.id,
                    worker_id,
                    DispatchAction::Failed,
                    Some(fault.message.clone()),
                );
                tracing::warn!(task_id = %spec.id, worker = worker_id, %fault, "worker execution failed");
                TaskResult::failed(
                    spec.id,
                    worker_id,
                    TaskFailure::Execution {
                        reason: fault.message,
                    },
                    elapsed,
                )
            }
            Err(_) => {
                let elapsed = in_flight.fail();
                self.record(spec.id, worker_id, DispatchAction::TimedOut, None);
                tracing::warn!(
                    task_id = %spec.id,
                    worker = worker_id,
                    limit_secs = spec.timeout_secs,
                    "task exceeded deadline"
                );
                TaskResult::failed(
                    spec.id,
                    worker_id,
                    TaskFailure::Timeout {
                        limit_secs: spec.timeout_secs,
                    },
                    elapsed,
                )
            }
        }
    }

    fn record(
        &self,
        task_id: uuid::Uuid,
        worker_id: &str,
        action: DispatchAction,
        detail: Option<String>,
    ) {
        if let Some(log) = &self.dispatch_log {
            log.lock()
                .record(DispatchEvent::new(task_id, worker_id, action, detail));
        }
    }
}

/// The candidate that follows `failed` in preference order, if any.
fn next_candidate<'a>(candidates: &'a [String], failed: &str) -> Option<&'a str> {
    let position = candidates.iter().position(|c| c == failed)?;
    candidates.get(position + 1).map(String::as_str)
}
