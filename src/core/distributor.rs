//! Chunked distribution of large item collections with batch statistics.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::core::{
    OrchestratorError, ParallelScheduler, TaskPayload, TaskResult, TaskSpec, WorkerConnector,
};

/// Aggregate statistics over one distribution run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchStatistics {
    /// Items submitted across all chunks.
    pub total_items: usize,
    /// Results that carried a payload.
    pub successful: usize,
    /// Results that carried a failure.
    pub failed: usize,
    /// `successful / total_items`; `0` for an empty run.
    pub success_rate: f64,
    /// Mean execution time over successful results only.
    pub average_execution_time_ms: f64,
    /// Successful attributions per worker.
    pub worker_distribution: HashMap<String, usize>,
    /// Completed items per wall-clock second for the whole run.
    pub items_per_second: f64,
}

impl BatchStatistics {
    /// Compute statistics over the results of one distribution run.
    #[must_use]
    pub fn from_results(results: &[TaskResult], elapsed: Duration) -> Self {
        let total_items = results.len();
        let successful = results.iter().filter(|r| r.success).count();
        let failed = total_items - successful;

        #[allow(clippy::cast_precision_loss)]
        let success_rate = if total_items == 0 {
            0.0
        } else {
            successful as f64 / total_items as f64
        };

        #[allow(clippy::cast_precision_loss)]
        let average_execution_time_ms = if successful == 0 {
            0.0
        } else {
            results
                .iter()
                .filter(|r| r.success)
                .map(|r| r.execution_time_ms as f64)
                .sum::<f64>()
                / successful as f64
        };

        let mut worker_distribution: HashMap<String, usize> = HashMap::new();
        for result in results.iter().filter(|r| r.success) {
            *worker_distribution
                .entry(result.worker_used.clone())
                .or_insert(0) += 1;
        }

        let elapsed_secs = elapsed.as_secs_f64();
        #[allow(clippy::cast_precision_loss)]
        let items_per_second = if elapsed_secs > 0.0 {
            total_items as f64 / elapsed_secs
        } else {
            0.0
        };

        Self {
            total_items,
            successful,
            failed,
            success_rate,
            average_execution_time_ms,
            worker_distribution,
            items_per_second,
        }
    }
}

/// Results plus statistics from one `distribute` call.
#[derive(Debug)]
pub struct DistributionReport {
    /// One result per input item, in input order.
    pub results: Vec<TaskResult>,
    /// Aggregate statistics across all chunks.
    pub statistics: BatchStatistics,
}

/// Splits item collections into fixed-size chunks and runs each chunk
/// through the parallel scheduler.
///
/// Chunks run strictly in sequence, separated by a short pause so a burst
/// of batches cannot overwhelm the downstream workers. Failures inside a
/// chunk are data; they never stop later chunks.
pub struct BatchDistributor<P, C>
where
    P: TaskPayload,
    C: WorkerConnector<P>,
{
    scheduler: ParallelScheduler<P, C>,
    chunk_concurrency: usize,
    pause_between_chunks: Duration,
}

impl<P, C> BatchDistributor<P, C>
where
    P: TaskPayload,
    C: WorkerConnector<P>,
{
    /// Build a distributor over a scheduler.
    pub(crate) const fn new(
        scheduler: ParallelScheduler<P, C>,
        chunk_concurrency: usize,
        pause_between_chunks: Duration,
    ) -> Self {
        Self {
            scheduler,
            chunk_concurrency,
            pause_between_chunks,
        }
    }

    /// Map every item to a task, run the tasks chunk by chunk, and report
    /// results plus aggregate statistics.
    ///
    /// An empty `items` slice is a no-op returning an empty report.
    ///
    /// # Errors
    ///
    /// [`OrchestratorError::InvalidTaskSpec`] when `batch_size` is zero;
    /// [`OrchestratorError::NoEligibleWorker`] when nothing is registered.
    /// Partial failures never error.
    pub async fn distribute<T, F>(
        &self,
        items: &[T],
        to_task: F,
        batch_size: usize,
    ) -> Result<DistributionReport, OrchestratorError>
    where
        F: Fn(&T) -> TaskSpec<P>,
    {
        if batch_size == 0 {
            return Err(OrchestratorError::InvalidTaskSpec(
                "batch_size must be greater than zero".into(),
            ));
        }

        let started = Instant::now();
        let chunk_count = items.len().div_ceil(batch_size);
        let mut results = Vec::with_capacity(items.len());

        for (chunk_index, chunk) in items.chunks(batch_size).enumerate() {
            let specs: Vec<TaskSpec<P>> = chunk.iter().map(&to_task).collect();
            tracing::info!(
                chunk = chunk_index + 1,
                chunks = chunk_count,
                size = specs.len(),
                "running chunk"
            );
            let chunk_results = self
                .scheduler
                .run_all(specs, self.chunk_concurrency)
                .await?;
            results.extend(chunk_results);

            if chunk_index + 1 < chunk_count && !self.pause_between_chunks.is_zero() {
                tokio::time::sleep(self.pause_between_chunks).await;
            }
        }

        let statistics = BatchStatistics::from_results(&results, started.elapsed());
        tracing::info!(
            total = statistics.total_items,
            successful = statistics.successful,
            failed = statistics.failed,
            items_per_second = statistics.items_per_second,
            "distribution complete"
        );
        Ok(DistributionReport {
            results,
            statistics,
        })
    }
}
