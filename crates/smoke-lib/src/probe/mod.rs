//! Disposable probes that perform a single HTTP request
//!
//! Two implementations are provided:
//! - [`PodProbe`] runs curl inside a short-lived, auto-removed pod
//! - [`DirectProbe`] issues the request from the local host

mod direct;
mod pod;

pub use direct::DirectProbe;
pub use pod::PodProbe;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

/// HTTP method used by a probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

/// A single HTTP request to perform
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeRequest {
    pub method: HttpMethod,
    pub url: String,
    pub body: Option<Value>,
}

impl ProbeRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            url: url.into(),
            body: None,
        }
    }

    pub fn post_json(url: impl Into<String>, body: Value) -> Self {
        Self {
            method: HttpMethod::Post,
            url: url.into(),
            body: Some(body),
        }
    }
}

/// Exit status and captured output of a probe
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeOutput {
    pub exit_code: i32,
    pub stdout: String,
}

/// Trait for dispatching a request through a disposable execution context
///
/// Implementations must release whatever they allocate before returning,
/// including when the request itself fails.
#[async_trait]
pub trait ProbeRunner: Send + Sync {
    async fn run(&self, request: &ProbeRequest) -> Result<ProbeOutput>;
}
