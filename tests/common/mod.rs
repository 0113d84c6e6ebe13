//! Shared test fixtures: a scriptable worker connector and config helpers.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use taskmux::config::{ExecutionConfig, OrchestratorConfig, RoutingConfig, WorkerEntry};
use taskmux::core::{DispatchEvent, DispatchSink, WorkerConnector, WorkerFault};

/// Scriptable connector: per-worker delays, injected faults, and
/// concurrency tracking. Counters are shared so a [`MockProbe`] taken
/// before the connector moves into an orchestrator keeps observing it.
#[derive(Default)]
pub struct MockConnector {
    base_delay: Duration,
    worker_delays: HashMap<String, Duration>,
    failing_workers: HashSet<String>,
    calls: Arc<AtomicU64>,
    concurrent: Arc<AtomicU64>,
    max_concurrent: Arc<AtomicU64>,
}

/// Read-only view of a [`MockConnector`]'s counters.
#[derive(Clone)]
pub struct MockProbe {
    calls: Arc<AtomicU64>,
    max_concurrent: Arc<AtomicU64>,
}

impl MockProbe {
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneously running executions observed.
    pub fn max_concurrent_seen(&self) -> u64 {
        self.max_concurrent.load(Ordering::SeqCst)
    }
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay applied to every execution unless overridden per worker.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Delay applied to executions on one specific worker.
    pub fn with_worker_delay(mut self, worker_id: &str, delay: Duration) -> Self {
        self.worker_delays.insert(worker_id.to_string(), delay);
        self
    }

    /// Make every execution on `worker_id` return a fault.
    pub fn failing(mut self, worker_id: &str) -> Self {
        self.failing_workers.insert(worker_id.to_string());
        self
    }

    /// Counter handle that outlives the connector move.
    pub fn probe(&self) -> MockProbe {
        MockProbe {
            calls: Arc::clone(&self.calls),
            max_concurrent: Arc::clone(&self.max_concurrent),
        }
    }
}

#[async_trait]
impl WorkerConnector<String> for MockConnector {
    async fn execute(
        &self,
        payload: &String,
        worker_id: &str,
        _timeout: Duration,
    ) -> Result<String, WorkerFault> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let current = self.concurrent.fetch_add(1, Ordering::SeqCst) + 1;
        let mut max = self.max_concurrent.load(Ordering::SeqCst);
        while current > max {
            match self.max_concurrent.compare_exchange_weak(
                max,
                current,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => break,
                Err(m) => max = m,
            }
        }

        let delay = self
            .worker_delays
            .get(worker_id)
            .copied()
            .unwrap_or(self.base_delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        self.concurrent.fetch_sub(1, Ordering::SeqCst);

        if self.failing_workers.contains(worker_id) {
            Err(WorkerFault::new(format!("injected fault on {worker_id}")))
        } else {
            Ok(format!("{worker_id}::{payload}"))
        }
    }
}

/// Dispatch sink that shares its event buffer with the test body.
#[derive(Clone, Default)]
pub struct SharedSink {
    events: Arc<Mutex<Vec<DispatchEvent>>>,
}

impl SharedSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<DispatchEvent> {
        self.events.lock().clone()
    }
}

impl DispatchSink for SharedSink {
    fn record(&mut self, event: DispatchEvent) {
        self.events.lock().push(event);
    }
}

/// One configured worker entry.
pub fn worker(
    id: &str,
    speed: f64,
    rating: u8,
    max_concurrent: u32,
    tags: &[&str],
) -> WorkerEntry {
    WorkerEntry {
        id: id.to_string(),
        speed_multiplier: speed,
        complexity_rating: rating,
        memory_footprint_mb: 4096,
        specializations: tags.iter().map(ToString::to_string).collect(),
        max_concurrent,
    }
}

/// Execution settings tuned for tests: no inter-chunk pause.
pub fn fast_execution() -> ExecutionConfig {
    ExecutionConfig {
        batch_pause_ms: 0,
        ..ExecutionConfig::default()
    }
}

/// The three-worker pool used across the suite: a fast generalist, a small
/// smart worker, and a mid-size smart worker.
pub fn trio_config() -> OrchestratorConfig {
    OrchestratorConfig {
        workers: vec![
            worker("w1", 3.0, 5, 5, &["fast"]),
            worker("w2", 1.0, 9, 2, &["smart"]),
            worker("w3", 1.8, 8, 3, &["smart"]),
        ],
        routing: RoutingConfig {
            preferences: HashMap::from([
                (
                    "trend_analysis".to_string(),
                    vec!["w2".to_string(), "w3".to_string()],
                ),
                (
                    "tagging".to_string(),
                    vec!["w1".to_string(), "w3".to_string()],
                ),
            ]),
            default_worker: "w1".to_string(),
        },
        execution: fast_execution(),
    }
}
