//! Bounded-concurrency execution of a list of tasks.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinSet;

use crate::core::{
    OrchestratorError, TaskExecutor, TaskFailure, TaskPayload, TaskResult, TaskSpec,
    WorkerConnector, UNATTRIBUTED_WORKER,
};

/// Runs many tasks concurrently under a global in-flight cap.
///
/// A fixed set of async workers pulls indexed specs from a shared queue
/// and results are reassembled by index, so the output order always
/// matches the input order no matter how execution interleaves.
pub struct ParallelScheduler<P, C>
where
    P: TaskPayload,
    C: WorkerConnector<P>,
{
    executor: Arc<TaskExecutor<P, C>>,
}

impl<P, C> ParallelScheduler<P, C>
where
    P: TaskPayload,
    C: WorkerConnector<P>,
{
    /// Build a scheduler over a shared executor.
    pub(crate) const fn new(executor: Arc<TaskExecutor<P, C>>) -> Self {
        Self { executor }
    }

    /// Execute every spec and return one result per spec, in input order.
    ///
    /// At most `max_concurrent` tasks are in flight at once. A fault that
    /// escapes an individual execution (worker panic, executor error
    /// reaching this layer) becomes a failed result attributed to
    /// [`UNATTRIBUTED_WORKER`]; the batch itself never aborts.
    ///
    /// # Errors
    ///
    /// [`OrchestratorError::InvalidTaskSpec`] when `max_concurrent` is
    /// zero. [`OrchestratorError::NoEligibleWorker`] surfaces from the
    /// facade before scheduling starts; see `Orchestrator::run_all`.
    pub async fn run_all(
        &self,
        specs: Vec<TaskSpec<P>>,
        max_concurrent: usize,
    ) -> Result<Vec<TaskResult>, OrchestratorError> {
        if max_concurrent == 0 {
            return Err(OrchestratorError::InvalidTaskSpec(
                "max_concurrent must be greater than zero".into(),
            ));
        }
        let total = specs.len();
        if total == 0 {
            return Ok(Vec::new());
        }

        // Remember ids so a slot left empty by an aborted worker can still
        // be answered with a correctly attributed failure.
        let ids: Vec<uuid::Uuid> = specs.iter().map(|s| s.id).collect();

        let queue: Arc<Mutex<VecDeque<(usize, TaskSpec<P>)>>> =
            Arc::new(Mutex::new(specs.into_iter().enumerate().collect()));

        let worker_count = max_concurrent.min(total);
        tracing::debug!(total, worker_count, "scheduling batch");

        let mut join_set = JoinSet::new();
        for _ in 0..worker_count {
            let queue = Arc::clone(&queue);
            let executor = Arc::clone(&self.executor);
            join_set.spawn(async move {
                let mut finished = Vec::new();
                loop {
                    // Brief sync lock; the queue is only touched between
                    // executions, never across an await.
                    let next = queue.lock().pop_front();
                    let Some((index, spec)) = next else { break };
                    let result = match executor.execute(&spec).await {
                        Ok(result) => result,
                        Err(err) => TaskResult::failed(
                            spec.id,
                            UNATTRIBUTED_WORKER,
                            TaskFailure::Execution {
                                reason: err.to_string(),
                            },
                            0,
                        ),
                    };
                    finished.push((index, result));
                }
                finished
            });
        }

        let mut slots: Vec<Option<TaskResult>> = (0..total).map(|_| None).collect();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(batch) => {
                    for (index, result) in batch {
                        slots[index] = Some(result);
                    }
                }
                Err(err) => {
                    tracing::error!(error = %err, "scheduler worker aborted");
                }
            }
        }

        Ok(slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.unwrap_or_else(|| {
                    TaskResult::failed(
                        ids[index],
                        UNATTRIBUTED_WORKER,
                        TaskFailure::Execution {
                            reason: "execution aborted before completion".into(),
                        },
                        0,
                    )
                })
            })
            .collect())
    }
}
