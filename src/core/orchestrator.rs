//! The orchestrator facade: one explicit object owning every component.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::config::ExecutionConfig;
use crate::core::executor::SharedDispatchLog;
use crate::core::{
    BatchDistributor, CapabilityTable, DispatchSink, DistributionReport, LoadBalancer,
    OrchestratorError, ParallelScheduler, RoutingTable, StatsTracker, TaskExecutor, TaskPayload,
    TaskResult, TaskSpec, WorkerConnector,
};

/// Read-only monitoring row for one worker, combining live stats with the
/// static capability profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerLoadSummary {
    /// Tasks currently in flight on the worker.
    pub active_tasks: u32,
    /// Attempts completed (success or failure) since construction.
    pub total_completed: u64,
    /// Smoothed response time in milliseconds.
    pub avg_response_time_ms: f64,
    /// Fraction of attempts that failed.
    pub error_rate: f64,
    /// Static reasoning-capability rating (1–10).
    pub capability_rating: u8,
    /// Static throughput multiplier relative to baseline.
    pub speed_multiplier: f64,
}

/// Single-process task orchestrator.
///
/// Owns the capability table, stats tracker, and routing table, and wires
/// them into the executor, scheduler, and distributor. Construct one and
/// pass it by reference wherever tasks are submitted — there is no global
/// instance.
pub struct Orchestrator<P, C>
where
    P: TaskPayload,
    C: WorkerConnector<P>,
{
    table: Arc<CapabilityTable>,
    stats: Arc<StatsTracker>,
    routing: Arc<RoutingTable>,
    connector: Arc<C>,
    execution: ExecutionConfig,
    executor: Arc<TaskExecutor<P, C>>,
    scheduler: ParallelScheduler<P, C>,
    distributor: BatchDistributor<P, C>,
}

impl<P, C> std::fmt::Debug for Orchestrator<P, C>
where
    P: TaskPayload,
    C: WorkerConnector<P>,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("execution", &self.execution)
            .finish_non_exhaustive()
    }
}

impl<P, C> Orchestrator<P, C>
where
    P: TaskPayload,
    C: WorkerConnector<P>,
{
    /// Build an orchestrator from its parts.
    #[must_use]
    pub fn new(
        table: CapabilityTable,
        routing: RoutingTable,
        execution: ExecutionConfig,
        connector: C,
    ) -> Self {
        let stats = Arc::new(StatsTracker::for_table(&table));
        Self::assemble(
            Arc::new(table),
            stats,
            Arc::new(routing),
            Arc::new(connector),
            execution,
            None,
        )
    }

    /// Attach a dispatch-event sink. Live counters carry over; only the
    /// wiring is rebuilt.
    #[must_use]
    pub fn with_dispatch_log(self, sink: Box<dyn DispatchSink>) -> Self {
        Self::assemble(
            self.table,
            self.stats,
            self.routing,
            self.connector,
            self.execution,
            Some(Arc::new(Mutex::new(sink))),
        )
    }

    fn assemble(
        table: Arc<CapabilityTable>,
        stats: Arc<StatsTracker>,
        routing: Arc<RoutingTable>,
        connector: Arc<C>,
        execution: ExecutionConfig,
        dispatch_log: Option<SharedDispatchLog>,
    ) -> Self {
        let balancer = LoadBalancer::new(
            Arc::clone(&table),
            Arc::clone(&stats),
            Arc::clone(&routing),
        );
        let executor = Arc::new(TaskExecutor::new(
            Arc::clone(&table),
            Arc::clone(&stats),
            balancer,
            Arc::clone(&connector),
            execution.load_factor,
            dispatch_log,
        ));
        let scheduler = ParallelScheduler::new(Arc::clone(&executor));
        let distributor = BatchDistributor::new(
            ParallelScheduler::new(Arc::clone(&executor)),
            execution.batch_concurrency,
            Duration::from_millis(execution.batch_pause_ms),
        );
        Self {
            table,
            stats,
            routing,
            connector,
            execution,
            executor,
            scheduler,
            distributor,
        }
    }

    /// Execute one task to a result.
    ///
    /// # Errors
    ///
    /// [`OrchestratorError::NoEligibleWorker`] when no workers are
    /// registered; execution failures come back inside the result.
    pub async fn execute(&self, spec: &TaskSpec<P>) -> Result<TaskResult, OrchestratorError> {
        if self.table.is_empty() {
            return Err(OrchestratorError::NoEligibleWorker);
        }
        self.executor.execute(spec).await
    }

    /// Execute every spec with at most `max_concurrent` in flight,
    /// returning one result per spec in submission order.
    ///
    /// # Errors
    ///
    /// [`OrchestratorError::NoEligibleWorker`] when no workers are
    /// registered; [`OrchestratorError::InvalidTaskSpec`] for a zero cap.
    /// Individual task failures are data inside the returned results.
    pub async fn run_all(
        &self,
        specs: Vec<TaskSpec<P>>,
        max_concurrent: usize,
    ) -> Result<Vec<TaskResult>, OrchestratorError> {
        if self.table.is_empty() {
            return Err(OrchestratorError::NoEligibleWorker);
        }
        self.scheduler.run_all(specs, max_concurrent).await
    }

    /// Map items to tasks and run them in fixed-size chunks with the
    /// configured chunk concurrency and inter-chunk pause.
    ///
    /// # Errors
    ///
    /// [`OrchestratorError::NoEligibleWorker`] when no workers are
    /// registered; [`OrchestratorError::InvalidTaskSpec`] for a zero
    /// `batch_size`. A chunk full of failures is still a success of the
    /// distribution itself.
    pub async fn distribute<T, F>(
        &self,
        items: &[T],
        to_task: F,
        batch_size: usize,
    ) -> Result<DistributionReport, OrchestratorError>
    where
        F: Fn(&T) -> TaskSpec<P>,
    {
        if self.table.is_empty() {
            return Err(OrchestratorError::NoEligibleWorker);
        }
        self.distributor.distribute(items, to_task, batch_size).await
    }

    /// Monitoring snapshot: one row per registered worker.
    ///
    /// Pure read; calling it twice without intervening task activity
    /// returns identical maps.
    #[must_use]
    pub fn load_summary(&self) -> HashMap<String, WorkerLoadSummary> {
        self.table
            .list()
            .into_iter()
            .map(|caps| {
                let stats = self.stats.snapshot(&caps.id).unwrap_or_default();
                (
                    caps.id.clone(),
                    WorkerLoadSummary {
                        active_tasks: stats.active_tasks,
                        total_completed: stats.total_tasks,
                        avg_response_time_ms: stats.avg_response_time_ms,
                        error_rate: stats.error_rate(),
                        capability_rating: caps.complexity_rating,
                        speed_multiplier: caps.speed_multiplier,
                    },
                )
            })
            .collect()
    }

    /// The registered capability profiles.
    #[must_use]
    pub fn capabilities(&self) -> &CapabilityTable {
        &self.table
    }

    /// Shared handle to the live stats tracker.
    #[must_use]
    pub const fn stats(&self) -> &Arc<StatsTracker> {
        &self.stats
    }

    /// The routing table in effect.
    #[must_use]
    pub fn routing(&self) -> &RoutingTable {
        &self.routing
    }

    /// The execution settings in effect.
    #[must_use]
    pub const fn execution(&self) -> &ExecutionConfig {
        &self.execution
    }
}
