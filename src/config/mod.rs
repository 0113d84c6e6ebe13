//! Configuration models for workers, routing, and execution limits.

/// Orchestrator configuration structures.
pub mod orchestrator;

pub use orchestrator::{ExecutionConfig, OrchestratorConfig, RoutingConfig, WorkerEntry};
