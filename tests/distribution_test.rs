//! Batch distribution: chunking, pacing, and aggregate statistics.

mod common;

use std::collections::HashMap;
use std::time::{Duration, Instant};

use common::{fast_execution, trio_config, worker, MockConnector};
use taskmux::builders::build_orchestrator;
use taskmux::config::{ExecutionConfig, OrchestratorConfig, RoutingConfig};
use taskmux::core::{Complexity, OrchestratorError, TaskSpec};

fn to_spec(item: &u32) -> TaskSpec<String> {
    TaskSpec::new("tagging", format!("item-{item}"), Complexity::Simple)
}

// ============================================================================
// CHUNKING AND COMPLETENESS
// ============================================================================

#[tokio::test]
async fn distribute_covers_every_item_exactly_once() {
    let connector = MockConnector::new();
    let probe = connector.probe();
    let orchestrator = build_orchestrator::<String, _>(&trio_config(), connector).unwrap();

    let items: Vec<u32> = (0..130).collect();
    let report = orchestrator.distribute(&items, to_spec, 50).await.unwrap();

    // 130 items in chunks of [50, 50, 30].
    assert_eq!(report.results.len(), 130);
    assert_eq!(probe.calls(), 130);
    assert_eq!(report.statistics.total_items, 130);
    assert_eq!(report.statistics.successful, 130);
    assert_eq!(report.statistics.failed, 0);
    assert!((report.statistics.success_rate - 1.0).abs() < 1e-9);
    assert!(report.statistics.items_per_second > 0.0);

    // Results keep item order across chunk boundaries.
    for (i, result) in report.results.iter().enumerate() {
        let payload = result.payload.as_deref().unwrap();
        assert!(payload.ends_with(&format!("::item-{i}")));
    }
}

#[tokio::test]
async fn chunk_concurrency_is_respected() {
    let connector = MockConnector::new().with_delay(Duration::from_millis(10));
    let probe = connector.probe();
    let orchestrator = build_orchestrator::<String, _>(&trio_config(), connector).unwrap();

    let items: Vec<u32> = (0..40).collect();
    orchestrator.distribute(&items, to_spec, 20).await.unwrap();

    // The trio config keeps the default chunk concurrency of 6.
    assert!(probe.max_concurrent_seen() <= 6);
}

#[tokio::test]
async fn empty_input_is_a_noop_not_an_error() {
    let orchestrator =
        build_orchestrator::<String, _>(&trio_config(), MockConnector::new()).unwrap();
    let report = orchestrator
        .distribute(&Vec::<u32>::new(), to_spec, 50)
        .await
        .unwrap();
    assert!(report.results.is_empty());
    assert_eq!(report.statistics.total_items, 0);
    assert!((report.statistics.success_rate).abs() < f64::EPSILON);
}

#[tokio::test]
async fn zero_batch_size_is_structurally_invalid() {
    let orchestrator =
        build_orchestrator::<String, _>(&trio_config(), MockConnector::new()).unwrap();
    let err = orchestrator
        .distribute(&[1u32, 2, 3], to_spec, 0)
        .await
        .unwrap_err();
    assert!(matches!(err, OrchestratorError::InvalidTaskSpec(_)));
}

// ============================================================================
// PARTIAL FAILURES ARE DATA
// ============================================================================

fn single_candidate_config() -> (OrchestratorConfig, MockConnector) {
    let cfg = OrchestratorConfig {
        workers: vec![worker("only", 1.0, 5, 4, &[]), worker("sink", 1.0, 5, 4, &[])],
        routing: RoutingConfig {
            // Single-candidate list: no fallback target exists.
            preferences: HashMap::from([("fragile".to_string(), vec!["only".to_string()])]),
            default_worker: "sink".to_string(),
        },
        execution: fast_execution(),
    };
    (cfg, MockConnector::new().failing("only"))
}

#[tokio::test]
async fn failing_chunks_do_not_stop_later_chunks() {
    let (cfg, connector) = single_candidate_config();
    let probe = connector.probe();
    let orchestrator = build_orchestrator::<String, _>(&cfg, connector).unwrap();

    let items: Vec<u32> = (0..30).collect();
    let report = orchestrator
        .distribute(
            &items,
            |item| TaskSpec::new("fragile", format!("item-{item}"), Complexity::Simple),
            10,
        )
        .await
        .unwrap();

    // Every chunk ran to completion even though every task failed.
    assert_eq!(report.results.len(), 30);
    assert_eq!(probe.calls(), 30);
    assert_eq!(report.statistics.failed, 30);
    assert!((report.statistics.success_rate).abs() < f64::EPSILON);
    assert!(report.statistics.worker_distribution.is_empty());
}

#[tokio::test]
async fn statistics_aggregate_across_mixed_chunks() {
    let cfg = OrchestratorConfig {
        workers: vec![
            worker("healthy", 2.0, 6, 6, &[]),
            worker("flaky_a", 1.0, 8, 2, &[]),
            worker("flaky_b", 1.0, 8, 2, &[]),
        ],
        routing: RoutingConfig {
            preferences: HashMap::from([
                ("safe".to_string(), vec!["healthy".to_string()]),
                (
                    "fragile".to_string(),
                    vec!["flaky_a".to_string(), "flaky_b".to_string()],
                ),
            ]),
            default_worker: "healthy".to_string(),
        },
        execution: fast_execution(),
    };
    let orchestrator = build_orchestrator::<String, _>(
        &cfg,
        MockConnector::new().failing("flaky_a").failing("flaky_b"),
    )
    .unwrap();

    // Even items route to the healthy worker; odd items route to the
    // fragile pair, where both the pick and its fallback fault.
    let items: Vec<u32> = (0..20).collect();
    let report = orchestrator
        .distribute(
            &items,
            |item| {
                let task_type = if item % 2 == 0 { "safe" } else { "fragile" };
                TaskSpec::new(task_type, format!("item-{item}"), Complexity::Simple)
            },
            8,
        )
        .await
        .unwrap();

    assert_eq!(report.statistics.total_items, 20);
    assert_eq!(report.statistics.successful, 10);
    assert_eq!(report.statistics.failed, 10);
    assert!((report.statistics.success_rate - 0.5).abs() < 1e-9);

    let attributed: usize = report.statistics.worker_distribution.values().sum();
    assert_eq!(attributed, 10);
    assert_eq!(report.statistics.worker_distribution.get("healthy"), Some(&10));
    // Failures never enter the distribution map.
    assert!(!report.statistics.worker_distribution.contains_key("flaky_a"));
}

// ============================================================================
// PACING
// ============================================================================

#[tokio::test]
async fn pause_separates_consecutive_chunks() {
    let mut cfg = trio_config();
    cfg.execution = ExecutionConfig {
        batch_pause_ms: 150,
        ..fast_execution()
    };
    let orchestrator =
        build_orchestrator::<String, _>(&cfg, MockConnector::new()).unwrap();

    let items: Vec<u32> = (0..6).collect();
    let started = Instant::now();
    // 3 chunks of 2 items: two inter-chunk pauses, none after the last.
    orchestrator.distribute(&items, to_spec, 2).await.unwrap();
    let elapsed = started.elapsed();

    assert!(elapsed >= Duration::from_millis(300));
    assert!(elapsed < Duration::from_millis(1500));
}
