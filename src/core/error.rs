//! Error types for orchestrator operations.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced by orchestrator components.
///
/// These are the *fatal* errors surfaced to callers. Per-task execution
/// failures never appear here; they are recovered inside the task executor
/// and reported as [`TaskFailure`] values on the affected result.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// The capability table has zero registered workers; nothing can run.
    #[error("no eligible worker: capability table is empty")]
    NoEligibleWorker,
    /// Lookup of a worker id that was never registered.
    #[error("unknown worker `{0}`")]
    UnknownWorker(String),
    /// Structurally invalid input (zero timeout, zero batch size, ...).
    #[error("invalid task spec: {0}")]
    InvalidTaskSpec(String),
    /// Configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Why a single task attempt did not produce a payload.
///
/// Carried inside a failed `TaskResult`; serializable so batch outcomes can
/// be exported as data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskFailure {
    /// The worker did not answer within the task deadline.
    Timeout {
        /// The deadline that was exceeded, in seconds.
        limit_secs: u64,
    },
    /// The worker call itself failed.
    Execution {
        /// Connector-provided failure description.
        reason: String,
    },
    /// The spec was malformed and never dispatched.
    InvalidSpec {
        /// What was wrong with the spec.
        reason: String,
    },
}

impl TaskFailure {
    /// True for deadline-exceeded failures.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Failure reported by a worker connector for a single execution.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct WorkerFault {
    /// Human-readable description of what went wrong inside the worker.
    pub message: String,
}

impl WorkerFault {
    /// Build a fault from any displayable reason.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
