//! Run configuration
//!
//! Values are layered: an optional JSON file under `~/.config/gateway-smoke`,
//! then `GATEWAY_SMOKE_*` environment variables, then command-line flags.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::SmokeError;
use crate::models::Endpoint;

/// Prefix for environment overrides
pub const ENV_PREFIX: &str = "GATEWAY_SMOKE";

pub const DEFAULT_NAMESPACE: &str = "llm-d";
pub const DEFAULT_PROBE_IMAGE: &str = "curlimages/curl:latest";
pub const DEFAULT_PROBE_PREFIX: &str = "smoke-probe";
pub const DEFAULT_GATEWAY_SELECTOR: &str = "app.kubernetes.io/component=inference-gateway";
pub const DEFAULT_POD_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

/// Overrides read from the config file and environment
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct EnvOverrides {
    pub namespace: Option<String>,
    pub model_id: Option<String>,
    pub host: Option<String>,
    pub probe_image: Option<String>,
    pub gateway_selector: Option<String>,
    pub pod_timeout_secs: Option<u64>,
    pub request_timeout_secs: Option<u64>,
}

impl EnvOverrides {
    /// Load overrides from the default config file and the process environment
    pub fn load() -> Result<Self, SmokeError> {
        let path = config_file_path();
        Self::from_sources(path.as_deref(), None)
    }

    /// Load overrides from an optional file and an environment map
    ///
    /// When `env` is `None` the process environment is read.
    pub fn from_sources(
        file: Option<&Path>,
        env: Option<HashMap<String, String>>,
    ) -> Result<Self, SmokeError> {
        let mut builder = config::Config::builder();

        if let Some(path) = file {
            builder = builder.add_source(
                config::File::from(path)
                    .format(config::FileFormat::Json)
                    .required(false),
            );
        }

        let built = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX).source(env),
            )
            .build()
            .map_err(|e| SmokeError::Config(e.to_string()))?;

        let overrides: EnvOverrides = built
            .try_deserialize()
            .map_err(|e| SmokeError::Config(e.to_string()))?;

        Ok(overrides.without_blanks())
    }

    /// Treat blank strings as unset
    fn without_blanks(self) -> Self {
        fn keep(value: Option<String>) -> Option<String> {
            value.filter(|v| !v.trim().is_empty())
        }

        Self {
            namespace: keep(self.namespace),
            model_id: keep(self.model_id),
            host: keep(self.host),
            probe_image: keep(self.probe_image),
            gateway_selector: keep(self.gateway_selector),
            ..self
        }
    }
}

/// Default config file location
pub fn config_file_path() -> Option<PathBuf> {
    dirs_next::home_dir().map(|home| {
        home.join(".config")
            .join("gateway-smoke")
            .join("config.json")
    })
}

/// How probe requests reach the gateway
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Transport {
    /// Disposable in-cluster pod running curl
    #[default]
    Pod,
    /// HTTP client on the local host
    Direct,
}

/// Settings for disposable probes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeSettings {
    /// Container image with curl available
    pub image: String,
    /// Pod name prefix, a random suffix is appended per dispatch
    pub name_prefix: String,
    /// Upper bound for the probe pod to start running
    pub pod_timeout: Duration,
    /// Upper bound for the HTTP request inside the probe
    pub request_timeout: Duration,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            image: DEFAULT_PROBE_IMAGE.to_string(),
            name_prefix: DEFAULT_PROBE_PREFIX.to_string(),
            pod_timeout: Duration::from_secs(DEFAULT_POD_TIMEOUT_SECS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

/// Immutable configuration for one run
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub namespace: String,
    /// Model id given on the command line
    pub explicit_model: Option<String>,
    /// Model id from the environment or config file
    pub env_model: Option<String>,
    /// Skip gateway discovery and use this address
    pub host_override: Option<Endpoint>,
    pub gateway_selector: String,
    pub probe: ProbeSettings,
    pub transport: Transport,
    pub kubeconfig: Option<PathBuf>,
    pub context: Option<String>,
    pub verbose: bool,
}

impl RunConfig {
    /// Combine command-line values with loaded overrides
    pub fn new(
        namespace_flag: Option<String>,
        model_flag: Option<String>,
        overrides: EnvOverrides,
    ) -> Result<Self, SmokeError> {
        let namespace = namespace_flag
            .filter(|ns| !ns.trim().is_empty())
            .or(overrides.namespace)
            .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());

        let host_override = overrides.host.as_deref().map(Endpoint::parse).transpose()?;

        let defaults = ProbeSettings::default();
        let probe = ProbeSettings {
            image: overrides.probe_image.unwrap_or(defaults.image),
            pod_timeout: overrides
                .pod_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.pod_timeout),
            request_timeout: overrides
                .request_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
            ..defaults
        };

        if probe.request_timeout.is_zero() {
            return Err(SmokeError::Config(
                "request timeout must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            namespace,
            explicit_model: model_flag,
            env_model: overrides.model_id,
            host_override,
            gateway_selector: overrides
                .gateway_selector
                .unwrap_or_else(|| DEFAULT_GATEWAY_SELECTOR.to_string()),
            probe,
            transport: Transport::default(),
            kubeconfig: None,
            context: None,
            verbose: false,
        })
    }

    pub fn with_transport(mut self, transport: Transport) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_kubeconfig(mut self, path: Option<PathBuf>) -> Self {
        self.kubeconfig = path;
        self
    }

    pub fn with_context(mut self, context: Option<String>) -> Self {
        self.context = context;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}
