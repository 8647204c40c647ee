//! Structured lifecycle logging with tracing

use tracing::{error, info, warn};

use crate::models::{Endpoint, IterationResult, ModelId, ModelSource};

/// Emits structured log events for one smoke-test run
#[derive(Debug, Clone)]
pub struct RunLogger {
    namespace: String,
}

impl RunLogger {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    pub fn log_run_start(&self, version: &str, iterations: u32) {
        info!(
            event = "run_start",
            namespace = %self.namespace,
            version = %version,
            iterations,
            "Gateway smoke test starting"
        );
    }

    pub fn log_endpoint(&self, endpoint: &Endpoint) {
        info!(
            event = "endpoint_resolved",
            namespace = %self.namespace,
            endpoint = %endpoint,
            "Gateway endpoint resolved"
        );
    }

    pub fn log_model(&self, model: &ModelId, source: ModelSource) {
        info!(
            event = "model_resolved",
            namespace = %self.namespace,
            model = %model,
            source = %source,
            "Model resolved"
        );
    }

    pub fn log_iteration(&self, result: &IterationResult) {
        if result.passed() {
            info!(
                event = "iteration",
                namespace = %self.namespace,
                iteration = result.index,
                passed = true,
                "Iteration passed"
            );
        } else {
            warn!(
                event = "iteration",
                namespace = %self.namespace,
                iteration = result.index,
                passed = false,
                failures = %result.failures().join("; "),
                "Iteration failed"
            );
        }
    }

    pub fn log_run_finished(&self, completed: u32, success: bool) {
        if success {
            info!(
                event = "run_finished",
                namespace = %self.namespace,
                completed,
                success,
                "Gateway smoke test passed"
            );
        } else {
            error!(
                event = "run_finished",
                namespace = %self.namespace,
                completed,
                success,
                "Gateway smoke test failed"
            );
        }
    }

    pub fn log_diagnostics(&self, sections: usize, failed_steps: usize) {
        info!(
            event = "diagnostics",
            namespace = %self.namespace,
            sections,
            failed_steps,
            "Diagnostic snapshot gathered"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_logger_creation() {
        let logger = RunLogger::new("llm-d");
        assert_eq!(logger.namespace, "llm-d");
    }
}
