//! End-to-end run orchestration
//!
//! Resolves the endpoint and model once, threads them into the iteration
//! runner, and gathers diagnostics on any fatal path.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

use crate::cluster::{ClusterCli, Kubectl};
use crate::config::{RunConfig, Transport};
use crate::diagnostics::{DiagnosticEmitter, DiagnosticSnapshot};
use crate::error::SmokeError;
use crate::models::{Endpoint, ModelId, ModelSource};
use crate::observability::RunLogger;
use crate::probe::{DirectProbe, PodProbe, ProbeRunner};
use crate::resolver::{EndpointResolver, ModelResolver};
use crate::runner::{IterationRunner, RunReporter, RunState, ITERATIONS};


/// Summary of a run, successful or not
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub namespace: String,
    pub endpoint: Option<Endpoint>,
    pub model: Option<ModelId>,
    pub model_source: Option<ModelSource>,
    pub iterations: u32,
    pub passed_iterations: u32,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    fn begin(namespace: &str) -> Self {
        let now = Utc::now();
        Self {
            namespace: namespace.to_string(),
            endpoint: None,
            model: None,
            model_source: None,
            iterations: ITERATIONS,
            passed_iterations: 0,
            success: false,
            failure: None,
            started_at: now,
            finished_at: now,
        }
    }
}

/// A fatal run outcome with its report and diagnostics
#[derive(Debug, Error)]
#[error("{error}")]
pub struct SmokeFailure {
    pub error: SmokeError,
    pub report: RunReport,
    pub diagnostics: Option<DiagnosticSnapshot>,
}

/// Gateway smoke test wired to a cluster and a probe
pub struct SmokeTest {
    config: RunConfig,
    cluster: Arc<dyn ClusterCli>,
    probe: Arc<dyn ProbeRunner>,
    logger: RunLogger,
}

impl SmokeTest {
    pub fn new(config: RunConfig, cluster: Arc<dyn ClusterCli>, probe: Arc<dyn ProbeRunner>) -> Self {
        let logger = RunLogger::new(&config.namespace);
        Self {
            config,
            cluster,
            probe,
            logger,
        }
    }

    /// Build a smoke test backed by `kubectl` and the configured transport
    pub fn from_config(config: RunConfig) -> Result<Self, SmokeError> {
        let cluster: Arc<dyn ClusterCli> = Arc::new(
            Kubectl::new()
                .kubeconfig(config.kubeconfig.clone())
                .context(config.context.clone())
                .verbose(config.verbose),
        );

        let probe: Arc<dyn ProbeRunner> = match config.transport {
            Transport::Pod => Arc::new(PodProbe::new(
                cluster.clone(),
                config.namespace.clone(),
                config.probe.clone(),
            )),
            Transport::Direct => Arc::new(
                DirectProbe::new(config.probe.request_timeout, config.verbose)
                    .map_err(|e| SmokeError::Config(format!("{:#}", e)))?,
            ),
        };

        Ok(Self::new(config, cluster, probe))
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Resolve, iterate, and report
    pub async fn run(&self, reporter: &dyn RunReporter) -> Result<RunReport, SmokeFailure> {
        let mut report = RunReport::begin(&self.config.namespace);
        self.logger.log_run_start(env!("CARGO_PKG_VERSION"), ITERATIONS);

        let endpoint = match EndpointResolver::new(self.cluster.clone())
            .resolve(&self.config.namespace, self.config.host_override.as_ref())
            .await
        {
            Ok(endpoint) => endpoint,
            Err(error) => return Err(self.fail(error, report).await),
        };
        self.logger.log_endpoint(&endpoint);
        reporter.endpoint_resolved(&endpoint);
        report.endpoint = Some(endpoint.clone());

        let resolved = ModelResolver::new(self.probe.clone())
            .resolve(
                self.config.explicit_model.as_deref(),
                self.config.env_model.as_deref(),
                &endpoint,
            )
            .await;
        let (model, source) = match resolved {
            Ok(resolved) => resolved,
            Err(error) => return Err(self.fail(error, report).await),
        };
        self.logger.log_model(&model, source);
        reporter.model_resolved(&model, source);
        report.model = Some(model.clone());
        report.model_source = Some(source);

        let state = IterationRunner::new(self.probe.clone())
            .run(&endpoint, &model, reporter, &self.logger)
            .await;

        match state {
            RunState::Halted {
                iteration,
                failures,
            } => {
                report.passed_iterations = iteration - 1;
                let error = SmokeError::IterationFailed {
                    iteration,
                    failures,
                };
                Err(self.fail(error, report).await)
            }
            _ => {
                report.passed_iterations = ITERATIONS;
                report.success = true;
                report.finished_at = Utc::now();
                self.logger.log_run_finished(report.passed_iterations, true);
                Ok(report)
            }
        }
    }

    async fn fail(&self, error: SmokeError, mut report: RunReport) -> SmokeFailure {
        let diagnostics = if error.wants_diagnostics() {
            let snapshot = DiagnosticEmitter::new(
                self.cluster.clone(),
                self.config.namespace.clone(),
                self.config.gateway_selector.clone(),
            )
            .gather()
            .await;
            self.logger
                .log_diagnostics(snapshot.sections.len(), snapshot.failed_steps());
            Some(snapshot)
        } else {
            None
        };

        report.failure = Some(error.to_string());
        report.finished_at = Utc::now();
        self.logger.log_run_finished(report.passed_iterations, false);

        SmokeFailure {
            error,
            report,
            diagnostics,
        }
    }
}
