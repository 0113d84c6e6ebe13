//! Task specifications and results.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::TaskFailure;

/// Worker id used for results that could not be attributed to a real
/// worker (spec rejected before selection, scheduler-level fault).
pub const UNATTRIBUTED_WORKER: &str = "unknown";

/// Default per-task deadline in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Marker trait for task payloads.
///
/// Payloads are opaque to the orchestrator; they only need to cross task
/// boundaries (`Send + Sync`) and be serializable so callers can log or
/// export the specs they build.
pub trait TaskPayload: Send + Sync + Serialize + for<'de> Deserialize<'de> + 'static {}

/// Blanket implementation: any type meeting the requirements is a payload.
impl<T> TaskPayload for T where T: Send + Sync + Serialize + for<'de> Deserialize<'de> + 'static {}

/// Coarse complexity class of a task.
///
/// A routing hint carried alongside the task type; it does not change the
/// selection scoring formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    /// Mechanical work any worker can absorb.
    Simple,
    /// Work that benefits from a high reasoning rating.
    Complex,
    /// Multi-step work routed to the coordinator-class worker.
    Coordination,
}

/// One unit of work to dispatch.
#[derive(Debug, Clone)]
pub struct TaskSpec<P> {
    /// Unique id for log and dispatch-event correlation.
    pub id: Uuid,
    /// Key into the routing table's preference lists.
    pub task_type: String,
    /// Opaque payload handed to the worker connector.
    pub payload: P,
    /// Routing hint; logged with the selection decision.
    pub complexity: Complexity,
    /// Forces selection of this worker, bypassing scoring entirely.
    pub preferred_worker: Option<String>,
    /// Per-task deadline in seconds. Must be non-zero.
    pub timeout_secs: u64,
}

impl<P> TaskSpec<P> {
    /// Build a spec with the default deadline and no forced worker.
    pub fn new(task_type: impl Into<String>, payload: P, complexity: Complexity) -> Self {
        Self {
            id: Uuid::new_v4(),
            task_type: task_type.into(),
            payload,
            complexity,
            preferred_worker: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Force selection of `worker_id`; the caller accepts responsibility
    /// for that worker's load.
    #[must_use]
    pub fn with_preferred_worker(mut self, worker_id: impl Into<String>) -> Self {
        self.preferred_worker = Some(worker_id.into());
        self
    }

    /// Override the per-task deadline.
    #[must_use]
    pub const fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

/// Outcome of one task, success or failure. Immutable once produced;
/// exactly one exists per submitted spec, in submission order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    /// Id of the spec this result answers.
    pub task_id: Uuid,
    /// Worker that produced the outcome, or [`UNATTRIBUTED_WORKER`].
    pub worker_used: String,
    /// Whether the task produced a payload.
    pub success: bool,
    /// Worker output; present iff `success`.
    pub payload: Option<String>,
    /// Failure classification; present iff `!success`.
    pub error: Option<TaskFailure>,
    /// Wall-clock execution time of the final attempt, in milliseconds.
    pub execution_time_ms: u64,
}

impl TaskResult {
    /// A successful result carrying the worker's output.
    #[must_use]
    pub fn completed(
        task_id: Uuid,
        worker_id: impl Into<String>,
        payload: String,
        execution_time_ms: u64,
    ) -> Self {
        Self {
            task_id,
            worker_used: worker_id.into(),
            success: true,
            payload: Some(payload),
            error: None,
            execution_time_ms,
        }
    }

    /// A failed result attributed to `worker_id`.
    #[must_use]
    pub fn failed(
        task_id: Uuid,
        worker_id: impl Into<String>,
        error: TaskFailure,
        execution_time_ms: u64,
    ) -> Self {
        Self {
            task_id,
            worker_used: worker_id.into(),
            success: false,
            payload: None,
            error: Some(error),
            execution_time_ms,
        }
    }

    /// A failed result for a spec that was never dispatched.
    #[must_use]
    pub fn rejected(task_id: Uuid, error: TaskFailure) -> Self {
        Self::failed(task_id, UNATTRIBUTED_WORKER, error, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_builder_sets_overrides() {
        let spec = TaskSpec::new("tagging", "payload".to_string(), Complexity::Simple)
            .with_preferred_worker("w2")
            .with_timeout_secs(5);
        assert_eq!(spec.preferred_worker.as_deref(), Some("w2"));
        assert_eq!(spec.timeout_secs, 5);
        assert_eq!(spec.task_type, "tagging");
    }

    #[test]
    fn completed_and_failed_results_are_mutually_exclusive() {
        let id = Uuid::new_v4();
        let ok = TaskResult::completed(id, "w1", "out".into(), 12);
        assert!(ok.success && ok.payload.is_some() && ok.error.is_none());

        let err = TaskResult::failed(id, "w1", TaskFailure::Timeout { limit_secs: 3 }, 3000);
        assert!(!err.success && err.payload.is_none() && err.error.is_some());
    }

    #[test]
    fn rejected_results_are_unattributed() {
        let res = TaskResult::rejected(
            Uuid::new_v4(),
            TaskFailure::InvalidSpec {
                reason: "zero timeout".into(),
            },
        );
        assert_eq!(res.worker_used, UNATTRIBUTED_WORKER);
        assert_eq!(res.execution_time_ms, 0);
    }

    #[test]
    fn complexity_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&Complexity::Coordination).unwrap(),
            "\"coordination\""
        );
    }
}
