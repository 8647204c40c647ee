//! Smoke-test library for deployed inference gateways
//!
//! This crate provides the core functionality for:
//! - Resolving the gateway endpoint and the model to exercise
//! - Dispatching HTTP requests through disposable probes
//! - Running the fixed validation loop and classifying each iteration
//! - Gathering best-effort cluster diagnostics on failure
//! - Configuration layering and structured logging

pub mod cluster;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod models;
pub mod observability;
pub mod probe;
pub mod resolver;
pub mod runner;
pub mod smoke;

#[cfg(test)]
mod fakes;

pub use cluster::{ClusterCli, CommandOutput, Kubectl};
pub use config::{EnvOverrides, ProbeSettings, RunConfig, Transport};
pub use diagnostics::{DiagnosticEmitter, DiagnosticSection, DiagnosticSnapshot};
pub use error::SmokeError;
pub use models::*;
pub use observability::RunLogger;
pub use probe::{DirectProbe, PodProbe, ProbeOutput, ProbeRequest, ProbeRunner};
pub use resolver::{EndpointResolver, ModelResolver, RetryPolicy};
pub use runner::{IterationRunner, RunReporter, RunState, ITERATIONS};
pub use smoke::{RunReport, SmokeFailure, SmokeTest};
