//! # Taskmux
//!
//! Load- and capability-aware orchestration of opaque tasks across a small,
//! fixed pool of heterogeneous workers.
//!
//! Taskmux sits between domain code that produces work and the workers
//! (typically locally hosted language-model endpoints) that execute it. The
//! workers differ in throughput, reasoning capability, memory footprint, and
//! concurrency capacity, so a round-robin dispatcher wastes the strong
//! workers and drowns the weak ones. Taskmux instead scores every candidate
//! on current load, historical reliability, and specialization match, and
//! routes each task to the single best fit — then feeds the outcome back
//! into the statistics that drive the next decision.
//!
//! ## Key Features
//!
//! - **Capability modeling**: static per-worker profiles (speed, reasoning
//!   rating, memory footprint, specialization tags, concurrency capacity)
//! - **Selection scoring**: load 40%, reliability 30%, specialization 30%,
//!   with stable preference-order tie-breaks
//! - **Guaranteed release**: an in-flight slot is returned on success,
//!   failure, timeout, panic, and cancellation — active counts cannot leak
//! - **Bounded concurrency**: a fixed set of async workers drains each
//!   batch; results always come back in submission order
//! - **Batch distribution**: fixed-size chunks, inter-chunk pacing, and
//!   aggregate statistics (success rate, throughput, per-worker counts)
//! - **Failures as data**: a task that times out or faults becomes a failed
//!   result, never an exception that aborts the batch
//!
//! ## Usage
//!
//! ```rust,ignore
//! use taskmux::builders::build_orchestrator;
//! use taskmux::config::OrchestratorConfig;
//! use taskmux::core::{Complexity, TaskSpec};
//!
//! let config = OrchestratorConfig::from_json_str(CONFIG_JSON)?;
//! let orchestrator = build_orchestrator(&config, my_connector)?;
//!
//! // Direct scheduling: N specs in, N results out, input order.
//! let specs = prompts
//!     .into_iter()
//!     .map(|p| TaskSpec::new("trend_analysis", p, Complexity::Complex))
//!     .collect();
//! let results = orchestrator.run_all(specs, 6).await?;
//!
//! // Or chunked distribution with aggregate statistics.
//! let report = orchestrator
//!     .distribute(&items, |item| to_spec(item), 50)
//!     .await?;
//! println!("{:.1}% ok", report.statistics.success_rate * 100.0);
//! ```
//!
//! Workers are external collaborators: implement
//! [`core::WorkerConnector`] for whatever actually runs the payloads, and
//! taskmux never needs to know what a task *is*.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core orchestration components and the orchestrator facade.
pub mod core;
/// Configuration models for workers, routing, and execution limits.
pub mod config;
/// Builders to construct an orchestrator from configuration.
pub mod builders;
/// Shared utilities.
pub mod util;
