//! Probe that issues requests from the local host

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use super::{HttpMethod, ProbeOutput, ProbeRequest, ProbeRunner};

/// curl exit code for a failed connection
const EXIT_CONNECT_FAILED: i32 = 7;
/// curl exit code for an operation timeout
const EXIT_TIMEOUT: i32 = 28;

/// Local HTTP probe with curl-compatible exit codes
///
/// Any HTTP response counts as exit 0, matching `curl -s` without `--fail`.
pub struct DirectProbe {
    client: Client,
    verbose: bool,
}

impl DirectProbe {
    pub fn new(request_timeout: Duration, verbose: bool) -> Result<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, verbose })
    }
}

#[async_trait]
impl ProbeRunner for DirectProbe {
    async fn run(&self, request: &ProbeRequest) -> Result<ProbeOutput> {
        if self.verbose {
            eprintln!("+ {} {}", request.method.as_str(), request.url);
        }

        let url = url::Url::parse(&request.url)
            .with_context(|| format!("Invalid probe URL: {}", request.url))?;

        let builder = match request.method {
            HttpMethod::Get => self.client.get(url),
            HttpMethod::Post => self.client.post(url),
        };
        let builder = match &request.body {
            Some(body) => builder.json(body),
            None => builder,
        };

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                debug!(url = %request.url, error = %e, "Direct probe request failed");
                let exit_code = if e.is_timeout() {
                    EXIT_TIMEOUT
                } else {
                    EXIT_CONNECT_FAILED
                };
                return Ok(ProbeOutput {
                    exit_code,
                    stdout: String::new(),
                });
            }
        };

        let status = response.status();
        match response.text().await {
            Ok(body) => {
                debug!(url = %request.url, status = %status, "Direct probe completed");
                Ok(ProbeOutput {
                    exit_code: 0,
                    stdout: body,
                })
            }
            Err(e) => {
                debug!(url = %request.url, error = %e, "Failed to read probe response body");
                Ok(ProbeOutput {
                    exit_code: if e.is_timeout() { EXIT_TIMEOUT } else { EXIT_CONNECT_FAILED },
                    stdout: String::new(),
                })
            }
        }
    }
}
