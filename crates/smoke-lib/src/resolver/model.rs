//! Model identifier resolution
//!
//! Precedence is strict: explicit flag, then environment override, then
//! discovery through the gateway's model listing with exponential backoff.

use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::SmokeError;
use crate::models::{Endpoint, ModelId, ModelSource, MODELS_PATH};
use crate::probe::{ProbeRequest, ProbeRunner};

/// Retry schedule for model discovery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Delay after the given failed attempt (1-based): 2s, 4s, 8s, ...
    pub fn backoff_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.initial_backoff * 2u32.pow(exponent)
    }
}

#[derive(Debug, Deserialize)]
struct ModelList {
    #[serde(default)]
    data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
}

/// Extract the first model id from a model listing body
///
/// The body is read as an OpenAI-style listing first. If that fails, the
/// first `"id":"<value>"` occurrence is taken, so partial or non-conforming
/// bodies still yield an id.
pub fn extract_model_id(body: &str) -> Option<String> {
    let structured = serde_json::from_str::<ModelList>(body)
        .ok()
        .and_then(|list| list.data.into_iter().map(|m| m.id).find(|id| !id.trim().is_empty()));

    structured.or_else(|| scan_id_field(body))
}

fn scan_id_field(body: &str) -> Option<String> {
    const KEY: &str = "\"id\"";
    let mut rest = body;

    while let Some(pos) = rest.find(KEY) {
        rest = &rest[pos + KEY.len()..];

        let value = rest
            .trim_start()
            .strip_prefix(':')
            .map(str::trim_start)
            .and_then(|v| v.strip_prefix('"'))
            .and_then(|v| v.find('"').map(|end| &v[..end]));

        if let Some(id) = value.filter(|id| !id.trim().is_empty()) {
            return Some(id.to_string());
        }
    }

    None
}

/// Resolves the model to exercise
pub struct ModelResolver {
    probe: Arc<dyn ProbeRunner>,
    policy: RetryPolicy,
}

impl ModelResolver {
    pub fn new(probe: Arc<dyn ProbeRunner>) -> Self {
        Self {
            probe,
            policy: RetryPolicy::default(),
        }
    }

    /// Resolve by precedence, discovering only when no value was supplied
    pub async fn resolve(
        &self,
        explicit: Option<&str>,
        env_override: Option<&str>,
        endpoint: &Endpoint,
    ) -> Result<(ModelId, ModelSource), SmokeError> {
        if let Some(id) = explicit.and_then(ModelId::new) {
            return Ok((id, ModelSource::Flag));
        }
        if let Some(id) = env_override.and_then(ModelId::new) {
            return Ok((id, ModelSource::Environment));
        }

        self.discover(endpoint)
            .await
            .map(|id| (id, ModelSource::Discovered))
    }

    /// Query the model listing until an id is found or attempts run out
    pub async fn discover(&self, endpoint: &Endpoint) -> Result<ModelId, SmokeError> {
        let request = ProbeRequest::get(endpoint.url(MODELS_PATH));
        let attempts = self.policy.max_attempts.max(1);

        for attempt in 1..=attempts {
            let failure = match self.probe.run(&request).await {
                Ok(out) if out.exit_code != 0 => format!("probe exited with status {}", out.exit_code),
                Ok(out) if out.stdout.trim().is_empty() => "empty response".to_string(),
                Ok(out) => match extract_model_id(&out.stdout).and_then(ModelId::new) {
                    Some(id) => {
                        info!(model = %id, attempt, "Model discovered");
                        return Ok(id);
                    }
                    None => {
                        debug!(body = %out.stdout.trim(), "No model id in listing");
                        "no model id in response".to_string()
                    }
                },
                Err(e) => e.to_string(),
            };

            if attempt < attempts {
                let backoff = self.policy.backoff_after(attempt);
                warn!(
                    attempt,
                    max_attempts = attempts,
                    error = %failure,
                    next_backoff_secs = backoff.as_secs(),
                    "Model discovery attempt failed"
                );
                tokio::time::sleep(backoff).await;
            } else {
                warn!(attempt, error = %failure, "Model discovery attempt failed, giving up");
            }
        }

        Err(SmokeError::ModelDiscoveryFailed { attempts })
    }
}
