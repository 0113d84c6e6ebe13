//! Orchestrator assembly from validated configuration.

use crate::config::OrchestratorConfig;
use crate::core::{
    CapabilityTable, Orchestrator, OrchestratorError, RoutingTable, TaskPayload, WorkerConnector,
};

/// Validate `config` and assemble an [`Orchestrator`] around `connector`.
///
/// # Errors
///
/// Returns [`OrchestratorError::InvalidConfig`] when the configuration
/// fails validation.
pub fn build_orchestrator<P, C>(
    config: &OrchestratorConfig,
    connector: C,
) -> Result<Orchestrator<P, C>, OrchestratorError>
where
    P: TaskPayload,
    C: WorkerConnector<P>,
{
    config.validate()?;

    let table = CapabilityTable::new(config.workers.iter().map(|w| w.to_capabilities()))?;
    let routing = RoutingTable::new(
        config.routing.preferences.clone(),
        config.routing.default_worker.clone(),
    );
    Ok(Orchestrator::new(
        table,
        routing,
        config.execution.clone(),
        connector,
    ))
}
