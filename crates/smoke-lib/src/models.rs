//! Core data models for a smoke-test run

use serde::{Deserialize, Serialize};

use crate::error::SmokeError;

/// Port the gateway listens on when no override is given
pub const DEFAULT_GATEWAY_PORT: u16 = 80;

/// Path for model listing
pub const MODELS_PATH: &str = "/v1/models";
/// Path for chat requests
pub const CHAT_PATH: &str = "/v1/chat/completions";
/// Path for completion requests
pub const COMPLETIONS_PATH: &str = "/v1/completions";

/// Fixed user message sent with every chat request
pub const CHAT_MESSAGE: &str = "Hello!  Who are you?";
/// Fixed prompt sent with every completion request
pub const COMPLETION_PROMPT: &str = "You are a helpful AI assistant.";

/// Resolved gateway address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    /// Create an endpoint, rejecting an empty host
    ///
    /// IPv6 hosts may be given with or without brackets.
    pub fn new(host: impl Into<String>, port: u16) -> Result<Self, SmokeError> {
        let host = host.into();
        let host = host.trim();
        let host = host
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(host)
            .to_string();
        if host.is_empty() {
            return Err(SmokeError::Config("endpoint host is empty".to_string()));
        }
        Ok(Self { host, port })
    }

    /// Parse `host`, `host:port`, `[v6]`, `[v6]:port` or a bare IPv6 address
    pub fn parse(value: &str) -> Result<Self, SmokeError> {
        let value = value.trim();
        let invalid_port = || SmokeError::Config(format!("invalid port in '{}'", value));

        if let Some(rest) = value.strip_prefix('[') {
            let (host, tail) = rest
                .split_once(']')
                .ok_or_else(|| SmokeError::Config(format!("unclosed bracket in '{}'", value)))?;
            let port = match tail {
                "" => DEFAULT_GATEWAY_PORT,
                _ => tail
                    .strip_prefix(':')
                    .and_then(|p| p.parse::<u16>().ok())
                    .ok_or_else(invalid_port)?,
            };
            return Self::new(host, port);
        }

        match value.rsplit_once(':') {
            Some((host, port)) if !host.contains(':') => {
                let port = port.parse::<u16>().map_err(|_| invalid_port())?;
                Self::new(host, port)
            }
            _ => Self::new(value, DEFAULT_GATEWAY_PORT),
        }
    }

    /// Host as it appears in a URL authority
    fn url_host(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        }
    }

    /// Base URL for requests against this endpoint
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.url_host(), self.port)
    }

    /// Full URL for a path on this endpoint
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url(), path)
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.url_host(), self.port)
    }
}

/// Non-empty model identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelId(String);

impl ModelId {
    /// Create a model id, returning `None` for empty or blank input
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into().trim().to_string();
        if value.is_empty() {
            None
        } else {
            Some(Self(value))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ModelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where the model id came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelSource {
    Flag,
    Environment,
    Discovered,
}

impl std::fmt::Display for ModelSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelSource::Flag => write!(f, "flag"),
            ModelSource::Environment => write!(f, "environment"),
            ModelSource::Discovered => write!(f, "auto-discovery"),
        }
    }
}

/// Request issued during an iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    Chat,
    Completion,
}

impl RequestKind {
    pub fn path(&self) -> &'static str {
        match self {
            RequestKind::Chat => CHAT_PATH,
            RequestKind::Completion => COMPLETIONS_PATH,
        }
    }

    /// JSON body for this request kind
    pub fn body(&self, model: &ModelId) -> serde_json::Value {
        let value = match self {
            RequestKind::Chat => serde_json::to_value(ChatRequest::new(model)),
            RequestKind::Completion => serde_json::to_value(CompletionRequest::new(model)),
        };
        value.unwrap_or(serde_json::Value::Null)
    }
}

impl std::fmt::Display for RequestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestKind::Chat => write!(f, "chat"),
            RequestKind::Completion => write!(f, "completion"),
        }
    }
}

/// Chat completion request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
}

impl ChatRequest {
    pub fn new(model: &ModelId) -> Self {
        Self {
            model: model.as_str().to_string(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: CHAT_MESSAGE.to_string(),
            }],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Text completion request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub model: String,
    pub prompt: String,
}

impl CompletionRequest {
    pub fn new(model: &ModelId) -> Self {
        Self {
            model: model.as_str().to_string(),
            prompt: COMPLETION_PROMPT.to_string(),
        }
    }
}

/// Result of a single request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Success { body: String },
    Failure { reason: String },
}

impl Outcome {
    /// Classify a probe result: exit 0 and a body containing `{`
    pub fn classify(exit_code: i32, body: &str) -> Self {
        if exit_code != 0 {
            Outcome::Failure {
                reason: format!("probe exited with status {}", exit_code),
            }
        } else if !body.contains('{') {
            let shown = body.trim();
            Outcome::Failure {
                reason: if shown.is_empty() {
                    "empty response body".to_string()
                } else {
                    format!("malformed response body: {}", shown)
                },
            }
        } else {
            Outcome::Success {
                body: body.to_string(),
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }
}

/// Result of one validation iteration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IterationResult {
    pub index: u32,
    pub chat: Outcome,
    pub completion: Outcome,
}

impl IterationResult {
    pub fn passed(&self) -> bool {
        self.chat.is_success() && self.completion.is_success()
    }

    /// Reasons for every failed request, prefixed with the request kind
    pub fn failures(&self) -> Vec<String> {
        [
            (RequestKind::Chat, &self.chat),
            (RequestKind::Completion, &self.completion),
        ]
        .into_iter()
        .filter_map(|(kind, outcome)| match outcome {
            Outcome::Failure { reason } => Some(format!("{}: {}", kind, reason)),
            Outcome::Success { .. } => None,
        })
        .collect()
    }
}
