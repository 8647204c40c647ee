//! Best-effort cluster diagnostics gathered on failure paths
//!
//! Every step tolerates its own failure: a missing resource type or a
//! permission error is recorded in its section and gathering continues.

use k8s_openapi::api::core::v1::Pod;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::cluster::{args, ClusterCli};

/// Number of event lines kept in the snapshot
pub const EVENT_LINES: usize = 20;
/// Number of gateway log lines fetched
pub const LOG_LINES: usize = 50;

/// One titled piece of diagnostic output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticSection {
    pub title: String,
    pub body: String,
    /// False when the gathering step itself failed
    pub captured: bool,
}

/// Read-only collection of cluster listings for operators
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiagnosticSnapshot {
    pub namespace: String,
    pub sections: Vec<DiagnosticSection>,
}

impl DiagnosticSnapshot {
    pub fn section(&self, title: &str) -> Option<&DiagnosticSection> {
        self.sections.iter().find(|s| s.title == title)
    }

    pub fn failed_steps(&self) -> usize {
        self.sections.iter().filter(|s| !s.captured).count()
    }
}

impl std::fmt::Display for DiagnosticSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Diagnostics for namespace '{}'", self.namespace)?;
        for section in &self.sections {
            writeln!(f)?;
            if section.captured {
                writeln!(f, "=== {} ===", section.title)?;
            } else {
                writeln!(f, "=== {} (unavailable) ===", section.title)?;
            }
            writeln!(f, "{}", section.body.trim_end())?;
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
struct PodList {
    #[serde(default)]
    items: Vec<Pod>,
}

/// Gathers a diagnostic snapshot for a namespace
pub struct DiagnosticEmitter {
    cluster: Arc<dyn ClusterCli>,
    namespace: String,
    gateway_selector: String,
}

impl DiagnosticEmitter {
    pub fn new(
        cluster: Arc<dyn ClusterCli>,
        namespace: impl Into<String>,
        gateway_selector: impl Into<String>,
    ) -> Self {
        Self {
            cluster,
            namespace: namespace.into(),
            gateway_selector: gateway_selector.into(),
        }
    }

    /// Gather every section, never failing as a whole
    pub async fn gather(&self) -> DiagnosticSnapshot {
        let ns = self.namespace.as_str();
        let listings: [(&str, Vec<String>); 7] = [
            ("Pods", args(["get", "pods", "-n", ns, "-o", "wide"])),
            ("Services", args(["get", "svc", "-n", ns])),
            ("Gateways", args(["get", "gateway", "-n", ns])),
            ("Gateway details", args(["get", "gateway", "-n", ns, "-o", "yaml"])),
            ("HTTP routes", args(["get", "httproute", "-n", ns])),
            ("HTTP route details", args(["get", "httproute", "-n", ns, "-o", "yaml"])),
            ("Inference pools", args(["get", "inferencepool", "-n", ns])),
        ];

        let mut sections = Vec::with_capacity(listings.len() + 2);
        for (title, cmd) in listings {
            sections.push(self.capture(title, &cmd).await);
        }

        let mut events = self
            .capture(
                "Recent events",
                &args(["get", "events", "-n", ns, "--sort-by=.lastTimestamp"]),
            )
            .await;
        if events.captured {
            events.body = last_lines(&events.body, EVENT_LINES);
        }
        sections.push(events);

        sections.push(self.gateway_logs().await);

        DiagnosticSnapshot {
            namespace: self.namespace.clone(),
            sections,
        }
    }

    async fn capture(&self, title: &str, cmd: &[String]) -> DiagnosticSection {
        let (body, captured) = match self.cluster.run(cmd).await {
            Ok(out) if out.success() => {
                let body = if out.stdout.trim().is_empty() {
                    "(no output)".to_string()
                } else {
                    out.stdout
                };
                (body, true)
            }
            Ok(out) => (
                format!("command exited with status {}: {}", out.status, out.stderr.trim()),
                false,
            ),
            Err(e) => (format!("command failed: {}", e), false),
        };

        if !captured {
            debug!(section = %title, "Diagnostic step failed");
        }

        DiagnosticSection {
            title: title.to_string(),
            body,
            captured,
        }
    }

    /// Name of the first pod matching the gateway selector
    async fn gateway_pod(&self) -> Result<Option<String>, String> {
        let out = self
            .cluster
            .run(&args([
                "get",
                "pods",
                "-n",
                self.namespace.as_str(),
                "-l",
                self.gateway_selector.as_str(),
                "-o",
                "json",
            ]))
            .await
            .map_err(|e| e.to_string())?;

        if !out.success() {
            return Err(format!(
                "pod lookup exited with status {}: {}",
                out.status,
                out.stderr.trim()
            ));
        }

        let list: PodList = serde_json::from_str(&out.stdout).map_err(|e| e.to_string())?;
        Ok(list.items.into_iter().find_map(|pod| pod.metadata.name))
    }

    async fn gateway_logs(&self) -> DiagnosticSection {
        let title = "Gateway logs";
        match self.gateway_pod().await {
            Ok(Some(pod)) => {
                let tail = format!("--tail={}", LOG_LINES);
                let mut section = self
                    .capture(
                        title,
                        &args(["logs", pod.as_str(), "-n", self.namespace.as_str(), tail.as_str()]),
                    )
                    .await;
                section.body = format!("pod/{}\n{}", pod, section.body);
                section
            }
            Ok(None) => DiagnosticSection {
                title: title.to_string(),
                body: format!("Gateway pod not found (selector {})", self.gateway_selector),
                captured: true,
            },
            Err(reason) => DiagnosticSection {
                title: title.to_string(),
                body: format!("gateway pod lookup failed: {}", reason),
                captured: false,
            },
        }
    }
}

fn last_lines(text: &str, count: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(count);
    lines[start..].join("\n")
}
