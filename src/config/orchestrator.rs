//! Orchestrator configuration structures.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::core::{OrchestratorError, WorkerCapabilities};

/// Capability profile for one worker, as configured.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerEntry {
    /// Worker identity (model tag or endpoint name).
    pub id: String,
    /// Throughput relative to a baseline worker.
    pub speed_multiplier: f64,
    /// Reasoning-capability rating, 1 to 10.
    pub complexity_rating: u8,
    /// Resident memory footprint in MB.
    pub memory_footprint_mb: u32,
    /// Task types this worker is specialized for.
    #[serde(default)]
    pub specializations: Vec<String>,
    /// Concurrency capacity used in load scoring.
    pub max_concurrent: u32,
}

impl WorkerEntry {
    /// Validate one entry's values.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::InvalidConfig`] naming the offending
    /// field.
    pub fn validate(&self) -> Result<(), OrchestratorError> {
        if self.id.is_empty() {
            return Err(OrchestratorError::InvalidConfig(
                "worker id must not be empty".into(),
            ));
        }
        if self.speed_multiplier <= 0.0 {
            return Err(OrchestratorError::InvalidConfig(format!(
                "worker `{}`: speed_multiplier must be positive",
                self.id
            )));
        }
        if !(1..=10).contains(&self.complexity_rating) {
            return Err(OrchestratorError::InvalidConfig(format!(
                "worker `{}`: complexity_rating must be between 1 and 10",
                self.id
            )));
        }
        if self.max_concurrent == 0 {
            return Err(OrchestratorError::InvalidConfig(format!(
                "worker `{}`: max_concurrent must be greater than 0",
                self.id
            )));
        }
        Ok(())
    }

    /// Convert to the runtime capability profile.
    #[must_use]
    pub fn to_capabilities(&self) -> WorkerCapabilities {
        WorkerCapabilities {
            id: self.id.clone(),
            speed_multiplier: self.speed_multiplier,
            complexity_rating: self.complexity_rating,
            memory_footprint_mb: self.memory_footprint_mb,
            specializations: self
                .specializations
                .iter()
                .cloned()
                .collect::<BTreeSet<String>>(),
            max_concurrent: self.max_concurrent,
        }
    }
}

/// Task-type routing: ordered preference lists plus the default worker
/// that unmapped task types fall back to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Map of task type to ordered candidate worker ids.
    #[serde(default)]
    pub preferences: HashMap<String, Vec<String>>,
    /// Worker used for task types with no preference list.
    pub default_worker: String,
}

/// Execution limits and pacing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Global in-flight cap for direct `run_all` calls.
    pub max_concurrent: usize,
    /// Items per distribution chunk.
    pub batch_size: usize,
    /// Pause between distribution chunks, in milliseconds.
    pub batch_pause_ms: u64,
    /// In-flight cap inside one distribution chunk.
    pub batch_concurrency: usize,
    /// Deadline applied to specs built from configuration defaults.
    pub default_timeout_secs: u64,
    /// Scales load sensitivity in selection scoring.
    pub load_factor: f64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            max_concurrent: num_cpus::get().max(1),
            batch_size: 50,
            batch_pause_ms: 500,
            batch_concurrency: 6,
            default_timeout_secs: 30,
            load_factor: 1.0,
        }
    }
}

impl ExecutionConfig {
    /// Validate limit values.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::InvalidConfig`] naming the offending
    /// field.
    pub fn validate(&self) -> Result<(), OrchestratorError> {
        if self.max_concurrent == 0 {
            return Err(OrchestratorError::InvalidConfig(
                "max_concurrent must be greater than 0".into(),
            ));
        }
        if self.batch_size == 0 {
            return Err(OrchestratorError::InvalidConfig(
                "batch_size must be greater than 0".into(),
            ));
        }
        if self.batch_concurrency == 0 {
            return Err(OrchestratorError::InvalidConfig(
                "batch_concurrency must be greater than 0".into(),
            ));
        }
        if self.default_timeout_secs == 0 {
            return Err(OrchestratorError::InvalidConfig(
                "default_timeout_secs must be greater than 0".into(),
            ));
        }
        if self.load_factor <= 0.0 {
            return Err(OrchestratorError::InvalidConfig(
                "load_factor must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Root orchestrator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Capability profiles, one per worker.
    pub workers: Vec<WorkerEntry>,
    /// Task-type routing.
    pub routing: RoutingConfig,
    /// Execution limits and pacing.
    #[serde(default)]
    pub execution: ExecutionConfig,
}

impl OrchestratorConfig {
    /// Validate the whole configuration: worker entries, unique ids,
    /// routing references, and execution limits.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::InvalidConfig`] describing the first
    /// problem found.
    pub fn validate(&self) -> Result<(), OrchestratorError> {
        if self.workers.is_empty() {
            return Err(OrchestratorError::InvalidConfig(
                "at least one worker must be defined".into(),
            ));
        }
        let mut seen = BTreeSet::new();
        for worker in &self.workers {
            worker.validate()?;
            if !seen.insert(worker.id.as_str()) {
                return Err(OrchestratorError::InvalidConfig(format!(
                    "duplicate worker id `{}`",
                    worker.id
                )));
            }
        }
        if !seen.contains(self.routing.default_worker.as_str()) {
            return Err(OrchestratorError::InvalidConfig(format!(
                "default_worker `{}` is not a registered worker",
                self.routing.default_worker
            )));
        }
        for (task_type, candidates) in &self.routing.preferences {
            if candidates.is_empty() {
                return Err(OrchestratorError::InvalidConfig(format!(
                    "preference list for `{task_type}` is empty"
                )));
            }
            for candidate in candidates {
                if !seen.contains(candidate.as_str()) {
                    return Err(OrchestratorError::InvalidConfig(format!(
                        "preference list for `{task_type}` references unknown worker `{candidate}`"
                    )));
                }
            }
        }
        self.execution.validate()
    }

    /// Parse a configuration from a JSON string and validate it.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::InvalidConfig`] for parse failures and
    /// for any validation problem.
    pub fn from_json_str(input: &str) -> Result<Self, OrchestratorError> {
        let cfg: Self = serde_json::from_str(input)
            .map_err(|e| OrchestratorError::InvalidConfig(format!("parse error: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn worker(id: &str) -> WorkerEntry {
        WorkerEntry {
            id: id.to_string(),
            speed_multiplier: 1.5,
            complexity_rating: 6,
            memory_footprint_mb: 4096,
            specializations: vec!["tagging".to_string()],
            max_concurrent: 3,
        }
    }

    fn config() -> OrchestratorConfig {
        OrchestratorConfig {
            workers: vec![worker("w1"), worker("w2")],
            routing: RoutingConfig {
                preferences: HashMap::from([(
                    "tagging".to_string(),
                    vec!["w1".to_string(), "w2".to_string()],
                )]),
                default_worker: "w1".to_string(),
            },
            execution: ExecutionConfig::default(),
        }
    }

    #[test]
    fn valid_config_passes() {
        assert!(config().validate().is_ok());
    }

    #[test]
    fn empty_worker_list_is_rejected() {
        let mut cfg = config();
        cfg.workers.clear();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn duplicate_worker_ids_are_rejected() {
        let mut cfg = config();
        cfg.workers.push(worker("w1"));
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn out_of_range_rating_is_rejected() {
        let mut cfg = config();
        cfg.workers[0].complexity_rating = 11;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn unregistered_default_worker_is_rejected() {
        let mut cfg = config();
        cfg.routing.default_worker = "ghost".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn preference_referencing_unknown_worker_is_rejected() {
        let mut cfg = config();
        cfg.routing
            .preferences
            .insert("summaries".to_string(), vec!["ghost".to_string()]);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn zero_limits_are_rejected() {
        let mut cfg = config();
        cfg.execution.batch_concurrency = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn config_round_trips_through_json() {
        let json = r#"{
            "workers": [
                {
                    "id": "phi3_mini",
                    "speed_multiplier": 3.0,
                    "complexity_rating": 6,
                    "memory_footprint_mb": 2300,
                    "specializations": ["tagging"],
                    "max_concurrent": 5
                }
            ],
            "routing": {
                "preferences": { "tagging": ["phi3_mini"] },
                "default_worker": "phi3_mini"
            }
        }"#;
        let cfg = OrchestratorConfig::from_json_str(json).unwrap();
        assert_eq!(cfg.workers.len(), 1);
        // Omitted execution block falls back to defaults.
        assert_eq!(cfg.execution.batch_size, 50);
        assert_eq!(cfg.execution.batch_concurrency, 6);
    }

    #[test]
    fn malformed_json_is_an_invalid_config() {
        assert!(matches!(
            OrchestratorConfig::from_json_str("{"),
            Err(OrchestratorError::InvalidConfig(_))
        ));
    }
}
