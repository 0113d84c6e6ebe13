//! Static worker capability profiles and the registry that holds them.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::core::OrchestratorError;

/// Static description of one worker's abilities.
///
/// Immutable for the process lifetime; created once at orchestrator
/// construction. Live load and reliability counters live in the stats
/// tracker, not here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerCapabilities {
    /// Worker identity (model tag or endpoint name).
    pub id: String,
    /// Throughput relative to a baseline worker (1.0 = baseline).
    pub speed_multiplier: f64,
    /// Reasoning-capability rating, 1 (weakest) to 10 (strongest).
    pub complexity_rating: u8,
    /// Resident memory footprint in MB. Informational only.
    pub memory_footprint_mb: u32,
    /// Task types this worker is specialized for.
    pub specializations: BTreeSet<String>,
    /// Concurrency capacity; advisory, enforced through selection scoring.
    pub max_concurrent: u32,
}

impl WorkerCapabilities {
    /// True if `task_type` is one of this worker's specializations.
    #[must_use]
    pub fn specializes_in(&self, task_type: &str) -> bool {
        self.specializations.contains(task_type)
    }
}

/// Read-only registry of worker capability profiles.
///
/// Registration order is preserved so listing and preference tie-breaks are
/// deterministic.
#[derive(Debug)]
pub struct CapabilityTable {
    workers: HashMap<String, WorkerCapabilities>,
    order: Vec<String>,
}

impl CapabilityTable {
    /// Build a table from capability profiles.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::InvalidConfig`] when two profiles share
    /// an id; a silent override would make selection depend on input order.
    pub fn new(
        profiles: impl IntoIterator<Item = WorkerCapabilities>,
    ) -> Result<Self, OrchestratorError> {
        let mut workers = HashMap::new();
        let mut order = Vec::new();
        for profile in profiles {
            if workers.contains_key(&profile.id) {
                return Err(OrchestratorError::InvalidConfig(format!(
                    "duplicate worker id `{}`",
                    profile.id
                )));
            }
            order.push(profile.id.clone());
            workers.insert(profile.id.clone(), profile);
        }
        Ok(Self { workers, order })
    }

    /// Look up one worker's capabilities.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::UnknownWorker`] for an unregistered id —
    /// never a default profile.
    pub fn get(&self, worker_id: &str) -> Result<&WorkerCapabilities, OrchestratorError> {
        self.workers
            .get(worker_id)
            .ok_or_else(|| OrchestratorError::UnknownWorker(worker_id.to_string()))
    }

    /// True if `worker_id` is registered.
    #[must_use]
    pub fn contains(&self, worker_id: &str) -> bool {
        self.workers.contains_key(worker_id)
    }

    /// All registered workers, in registration order.
    #[must_use]
    pub fn list(&self) -> Vec<&WorkerCapabilities> {
        self.order
            .iter()
            .filter_map(|id| self.workers.get(id))
            .collect()
    }

    /// Registered worker ids, in registration order.
    #[must_use]
    pub fn ids(&self) -> &[String] {
        &self.order
    }

    /// Number of registered workers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// True when no workers are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
