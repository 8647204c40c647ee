//! Gateway address discovery

use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};

use crate::cluster::{args, ClusterCli};
use crate::error::SmokeError;
use crate::models::{Endpoint, DEFAULT_GATEWAY_PORT};

#[derive(Debug, Default, Deserialize)]
struct GatewayList {
    #[serde(default)]
    items: Vec<Gateway>,
}

#[derive(Debug, Deserialize)]
struct Gateway {
    #[serde(default)]
    metadata: GatewayMetadata,
    #[serde(default)]
    status: Option<GatewayStatus>,
}

#[derive(Debug, Default, Deserialize)]
struct GatewayMetadata {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Default, Deserialize)]
struct GatewayStatus {
    #[serde(default)]
    addresses: Vec<GatewayAddress>,
}

#[derive(Debug, Deserialize)]
struct GatewayAddress {
    #[serde(default)]
    value: String,
}

/// Resolves the gateway endpoint registered in a namespace
pub struct EndpointResolver {
    cluster: Arc<dyn ClusterCli>,
}

impl EndpointResolver {
    pub fn new(cluster: Arc<dyn ClusterCli>) -> Self {
        Self { cluster }
    }

    /// Resolve the endpoint, preferring an explicit override
    pub async fn resolve(
        &self,
        namespace: &str,
        host_override: Option<&Endpoint>,
    ) -> Result<Endpoint, SmokeError> {
        if let Some(endpoint) = host_override {
            info!(endpoint = %endpoint, "Using gateway host override");
            return Ok(endpoint.clone());
        }

        let not_found = |reason: String| SmokeError::EndpointNotFound {
            namespace: namespace.to_string(),
            reason,
        };

        let out = self
            .cluster
            .run(&args(["get", "gateway", "-n", namespace, "-o", "json"]))
            .await
            .map_err(|e| not_found(e.to_string()))?;

        if !out.success() {
            return Err(not_found(format!(
                "gateway query exited with status {}: {}",
                out.status,
                out.stderr.trim()
            )));
        }

        let list: GatewayList = serde_json::from_str(&out.stdout)
            .map_err(|e| not_found(format!("unreadable gateway listing: {}", e)))?;

        let (gateway, host) = list
            .items
            .iter()
            .find_map(|gw| {
                gw.status
                    .as_ref()?
                    .addresses
                    .iter()
                    .map(|a| a.value.trim())
                    .find(|v| !v.is_empty())
                    .map(|v| (gw.metadata.name.as_str(), v.to_string()))
            })
            .ok_or_else(|| not_found("no gateway reports an address".to_string()))?;

        debug!(gateway = %gateway, address = %host, "Gateway address discovered");
        Endpoint::new(host, DEFAULT_GATEWAY_PORT).map_err(|e| not_found(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::ScriptedCluster;

    const LISTING: &str = r#"{
        "apiVersion": "v1",
        "kind": "List",
        "items": [
            {"metadata": {"name": "pending-gw"}, "status": {"addresses": []}},
            {"metadata": {"name": "infra-gateway"},
             "status": {"addresses": [{"type": "IPAddress", "value": "10.0.0.5"},
                                      {"type": "IPAddress", "value": "10.0.0.6"}]}}
        ]
    }"#;

    #[tokio::test]
    async fn test_first_address_with_fixed_port() {
        let cluster = Arc::new(ScriptedCluster::new());
        cluster.respond_ok("get gateway -n llm-d -o json", LISTING);

        let endpoint = EndpointResolver::new(cluster)
            .resolve("llm-d", None)
            .await
            .unwrap();
        assert_eq!(endpoint.to_string(), "10.0.0.5:80");
    }

    #[tokio::test]
    async fn test_override_skips_cluster_query() {
        let cluster = Arc::new(ScriptedCluster::new());
        let forced = Endpoint::new("gw.example", 8080).unwrap();

        let endpoint = EndpointResolver::new(cluster.clone())
            .resolve("llm-d", Some(&forced))
            .await
            .unwrap();
        assert_eq!(endpoint, forced);
        assert!(cluster.calls().is_empty());
    }

    #[tokio::test]
    async fn test_no_address_is_not_found() {
        let cluster = Arc::new(ScriptedCluster::new());
        cluster.respond_ok("get gateway", r#"{"items": []}"#);

        let err = EndpointResolver::new(cluster)
            .resolve("llm-d", None)
            .await
            .unwrap_err();
        assert!(matches!(err, SmokeError::EndpointNotFound { ref namespace, .. } if namespace == "llm-d"));
    }

    #[tokio::test]
    async fn test_query_failure_is_not_found() {
        let cluster = Arc::new(ScriptedCluster::new());
        cluster.fail("get gateway", "kubectl not installed");

        let err = EndpointResolver::new(cluster)
            .resolve("llm-d", None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("kubectl not installed"));
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_not_found() {
        let cluster = Arc::new(ScriptedCluster::new());
        let err = EndpointResolver::new(cluster)
            .resolve("other", None)
            .await
            .unwrap_err();
        assert!(matches!(err, SmokeError::EndpointNotFound { .. }));
    }
}
