//! Error taxonomy for a smoke-test run

use thiserror::Error;

/// Fatal errors that end a smoke-test run
#[derive(Debug, Error)]
pub enum SmokeError {
    /// No gateway address could be discovered
    #[error("no gateway address found in namespace '{namespace}': {reason}")]
    EndpointNotFound { namespace: String, reason: String },

    /// Model discovery exhausted its retries without an identifier
    #[error("model discovery failed after {attempts} attempts")]
    ModelDiscoveryFailed { attempts: u32 },

    /// An iteration had at least one failed request
    #[error("iteration {iteration} failed: {}", failures.join("; "))]
    IterationFailed {
        iteration: u32,
        failures: Vec<String>,
    },

    /// Invalid configuration, raised before any cluster work
    #[error("configuration error: {0}")]
    Config(String),
}

impl SmokeError {
    /// Whether a diagnostic snapshot should accompany this error
    pub fn wants_diagnostics(&self) -> bool {
        !matches!(self, SmokeError::Config(_))
    }
}
