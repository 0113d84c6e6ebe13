//! Load- and reliability-aware worker selection.

use std::collections::HashMap;
use std::sync::Arc;

use crate::core::{CapabilityTable, Complexity, OrchestratorError, StatsTracker, WorkerStats};

/// Weight of current load in the overall score.
const LOAD_WEIGHT: f64 = 0.4;
/// Weight of historical reliability in the overall score.
const PERFORMANCE_WEIGHT: f64 = 0.3;
/// Weight of specialization match in the overall score.
const CAPABILITY_WEIGHT: f64 = 0.3;
/// Capability score for a worker specialized in the task type.
const SPECIALIZED_SCORE: f64 = 0.8;
/// Capability score for a generalist.
const GENERALIST_SCORE: f64 = 0.5;
/// Error-rate penalty is capped so one bad streak cannot zero a worker out.
const MAX_ERROR_PENALTY: f64 = 0.5;

/// Static mapping from task type to an ordered list of candidate workers.
///
/// Unknown task types resolve to the designated default (coordinator)
/// worker — an explicit entry, never a silent miss.
#[derive(Debug, Clone)]
pub struct RoutingTable {
    preferences: HashMap<String, Vec<String>>,
    default_worker: String,
}

impl RoutingTable {
    /// Build a routing table.
    pub fn new(
        preferences: HashMap<String, Vec<String>>,
        default_worker: impl Into<String>,
    ) -> Self {
        Self {
            preferences,
            default_worker: default_worker.into(),
        }
    }

    /// Ordered candidate ids for `task_type`; the default worker for
    /// unmapped types.
    #[must_use]
    pub fn candidates(&self, task_type: &str) -> Vec<&str> {
        self.preferences.get(task_type).map_or_else(
            || vec![self.default_worker.as_str()],
            |list| list.iter().map(String::as_str).collect(),
        )
    }

    /// The worker unmapped task types fall back to.
    #[must_use]
    pub fn default_worker(&self) -> &str {
        &self.default_worker
    }
}

/// Scores candidate workers against live stats and picks the best.
///
/// Selection is a pure function of the capability table, the routing
/// table, and a stats snapshot; it has no side effects.
#[derive(Debug, Clone)]
pub struct LoadBalancer {
    table: Arc<CapabilityTable>,
    stats: Arc<StatsTracker>,
    routing: Arc<RoutingTable>,
}

impl LoadBalancer {
    /// Build a balancer over shared table, stats, and routing.
    pub const fn new(
        table: Arc<CapabilityTable>,
        stats: Arc<StatsTracker>,
        routing: Arc<RoutingTable>,
    ) -> Self {
        Self {
            table,
            stats,
            routing,
        }
    }

    /// Resolve the preference list for `task_type` to registered workers.
    ///
    /// A list that resolves to nothing (stale routing) falls back to every
    /// registered worker rather than failing the task.
    #[must_use]
    pub fn eligible(&self, task_type: &str) -> Vec<String> {
        let known: Vec<String> = self
            .routing
            .candidates(task_type)
            .into_iter()
            .filter(|id| self.table.contains(id))
            .map(ToString::to_string)
            .collect();
        if known.is_empty() {
            self.table.ids().to_vec()
        } else {
            known
        }
    }

    /// Pick the best worker for a task.
    ///
    /// Candidates come from the routing table in preference order; each is
    /// scored on current load, historical reliability, and specialization
    /// match, and the maximum wins. Ties keep the earliest candidate. A
    /// worker at capacity is still returned when every alternative is
    /// saturated too — per-worker concurrency is advisory here.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::NoEligibleWorker`] only when the
    /// capability table has zero registered workers.
    pub fn select_worker(
        &self,
        task_type: &str,
        complexity: Complexity,
        load_factor: f64,
    ) -> Result<String, OrchestratorError> {
        if self.table.is_empty() {
            return Err(OrchestratorError::NoEligibleWorker);
        }

        let mut best: Option<(String, f64)> = None;
        for candidate in self.eligible(task_type) {
            let Ok(caps) = self.table.get(&candidate) else {
                continue;
            };
            let Ok(stats) = self.stats.snapshot(&candidate) else {
                continue;
            };
            let score = overall_score(
                &stats,
                caps.max_concurrent,
                caps.specializes_in(task_type),
                load_factor,
            );
            tracing::trace!(worker = %candidate, score, "scored candidate");
            // Strict comparison keeps the earliest candidate on ties.
            if best.as_ref().map_or(true, |(_, top)| score > *top) {
                best = Some((candidate, score));
            }
        }

        let (chosen, score) = best.ok_or(OrchestratorError::NoEligibleWorker)?;
        tracing::debug!(
            task_type,
            ?complexity,
            worker = %chosen,
            score,
            "selected worker"
        );
        Ok(chosen)
    }
}

/// Composite selection score in `[0, 1]`; higher is better.
fn overall_score(stats: &WorkerStats, max_concurrent: u32, specialized: bool, load_factor: f64) -> f64 {
    let load_score = 1.0 - (utilization(stats.active_tasks, max_concurrent) * load_factor).min(1.0);
    let performance_score = 1.0 - stats.error_rate().min(MAX_ERROR_PENALTY);
    let capability_score = if specialized {
        SPECIALIZED_SCORE
    } else {
        GENERALIST_SCORE
    };
    load_score * LOAD_WEIGHT
        + performance_score * PERFORMANCE_WEIGHT
        + capability_score * CAPABILITY_WEIGHT
}

fn utilization(active: u32, max_concurrent: u32) -> f64 {
    if max_concurrent == 0 {
        1.0
    } else {
        f64::from(active) / f64::from(max_concurrent)
    }
}
