//! The external worker capability boundary.

use std::time::Duration;

use async_trait::async_trait;

use crate::core::{TaskPayload, WorkerFault};

/// Capability implemented by the code that actually runs tasks — in the
/// source deployment, locally hosted language-model endpoints.
///
/// The orchestrator only ever calls this one method. Implementations must
/// tolerate concurrent invocation; the executor additionally wraps every
/// call in its own deadline, so respecting `timeout` inside the connector
/// is an optimization, not a requirement.
///
/// # Example
///
/// ```rust,ignore
/// use async_trait::async_trait;
/// use std::time::Duration;
/// use taskmux::core::{WorkerConnector, WorkerFault};
///
/// struct LlmEndpoints;
///
/// #[async_trait]
/// impl WorkerConnector<String> for LlmEndpoints {
///     async fn execute(
///         &self,
///         prompt: &String,
///         worker_id: &str,
///         _timeout: Duration,
///     ) -> Result<String, WorkerFault> {
///         // POST the prompt to the endpoint registered under `worker_id`.
///         Ok(format!("{worker_id} answered"))
///     }
/// }
/// ```
#[async_trait]
pub trait WorkerConnector<P>: Send + Sync + 'static
where
    P: TaskPayload,
{
    /// Run one payload on the worker identified by `worker_id`.
    ///
    /// # Errors
    ///
    /// Returns a [`WorkerFault`] when the worker cannot produce a text
    /// result for any reason other than the orchestrator-enforced deadline.
    async fn execute(
        &self,
        payload: &P,
        worker_id: &str,
        timeout: Duration,
    ) -> Result<String, WorkerFault>;
}
