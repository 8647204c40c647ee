//! Probe pods dispatched with `kubectl run --rm`

use anyhow::Result;
use async_trait::async_trait;
use rand::Rng;
use std::sync::Arc;
use tracing::{debug, warn};

use super::{ProbeOutput, ProbeRequest, ProbeRunner};
use crate::cluster::ClusterCli;
use crate::config::ProbeSettings;

/// Range for the random pod name suffix
pub const SUFFIX_RANGE: std::ops::RangeInclusive<u32> = 1..=10000;

/// Runs curl in a disposable pod inside the target namespace
pub struct PodProbe {
    cluster: Arc<dyn ClusterCli>,
    namespace: String,
    settings: ProbeSettings,
}

impl PodProbe {
    pub fn new(cluster: Arc<dyn ClusterCli>, namespace: impl Into<String>, settings: ProbeSettings) -> Self {
        Self {
            cluster,
            namespace: namespace.into(),
            settings,
        }
    }

    /// Generate a pod name with a fresh random suffix
    pub fn pod_name(&self) -> String {
        let suffix = rand::thread_rng().gen_range(SUFFIX_RANGE);
        format!("{}-{}", self.settings.name_prefix, suffix)
    }

    /// Arguments for `kubectl run` performing the request
    pub fn run_args(&self, pod_name: &str, request: &ProbeRequest) -> Vec<String> {
        let mut args = vec![
            "run".to_string(),
            pod_name.to_string(),
            "-n".to_string(),
            self.namespace.clone(),
            "--rm".to_string(),
            "-i".to_string(),
            "--restart=Never".to_string(),
            "--quiet".to_string(),
            format!("--image={}", self.settings.image),
            format!("--pod-running-timeout={}s", self.settings.pod_timeout.as_secs()),
            "--".to_string(),
            "curl".to_string(),
            "-s".to_string(),
            "-m".to_string(),
            self.settings.request_timeout.as_secs().to_string(),
            "-X".to_string(),
            request.method.as_str().to_string(),
            request.url.clone(),
        ];

        if let Some(body) = &request.body {
            args.push("-H".to_string());
            args.push("Content-Type: application/json".to_string());
            args.push("-d".to_string());
            args.push(body.to_string());
        }

        args
    }

    /// Remove a pod left behind by a failed run
    async fn cleanup(&self, pod_name: &str) {
        let args = vec![
            "delete".to_string(),
            "pod".to_string(),
            pod_name.to_string(),
            "-n".to_string(),
            self.namespace.clone(),
            "--ignore-not-found".to_string(),
            "--wait=false".to_string(),
        ];

        match self.cluster.run(&args).await {
            Ok(out) if out.success() => debug!(pod = %pod_name, "Probe pod cleaned up"),
            Ok(out) => warn!(pod = %pod_name, stderr = %out.stderr.trim(), "Probe pod cleanup failed"),
            Err(e) => warn!(pod = %pod_name, error = %e, "Probe pod cleanup failed"),
        }
    }
}

#[async_trait]
impl ProbeRunner for PodProbe {
    async fn run(&self, request: &ProbeRequest) -> Result<ProbeOutput> {
        let pod_name = self.pod_name();
        let args = self.run_args(&pod_name, request);

        let result = self.cluster.run(&args).await;

        let needs_cleanup = !matches!(&result, Ok(out) if out.success());
        if needs_cleanup {
            self.cleanup(&pod_name).await;
        }

        let out = result?;
        if !out.success() {
            debug!(
                pod = %pod_name,
                status = out.status,
                stderr = %out.stderr.trim(),
                "Probe pod exited with failure"
            );
        }

        Ok(ProbeOutput {
            exit_code: out.status,
            stdout: out.stdout,
        })
    }
}
