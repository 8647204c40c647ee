//! Sequential validation loop
//!
//! Each iteration sends a chat request and then a completion request. The
//! completion request is sent even when the chat request failed, so both
//! outcomes are reported. The first failed iteration halts the run.

use std::sync::Arc;
use tracing::debug;

use crate::models::{Endpoint, IterationResult, ModelId, ModelSource, Outcome, RequestKind};
use crate::observability::RunLogger;
use crate::probe::{ProbeRequest, ProbeRunner};

/// Number of validation iterations per run
pub const ITERATIONS: u32 = 10;

/// Progress of the validation loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
    /// Iteration `n` is next
    Running(u32),
    /// All iterations passed
    Completed,
    /// Iteration `iteration` failed
    Halted {
        iteration: u32,
        failures: Vec<String>,
    },
}

impl RunState {
    pub fn start() -> Self {
        RunState::Running(1)
    }

    /// Apply an iteration result to a running state
    pub fn advance(self, result: &IterationResult, total: u32) -> Self {
        match self {
            RunState::Running(i) if !result.passed() => RunState::Halted {
                iteration: i,
                failures: result.failures(),
            },
            RunState::Running(i) if i >= total => RunState::Completed,
            RunState::Running(i) => RunState::Running(i + 1),
            terminal => terminal,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, RunState::Running(_))
    }
}

/// Receives progress as the loop runs
pub trait RunReporter: Send + Sync {
    fn endpoint_resolved(&self, _endpoint: &Endpoint) {}

    fn model_resolved(&self, _model: &ModelId, _source: ModelSource) {}

    fn iteration_started(&self, _index: u32, _total: u32) {}

    fn iteration_finished(&self, result: &IterationResult);
}

/// Runs the fixed number of iterations against a resolved endpoint and model
pub struct IterationRunner {
    probe: Arc<dyn ProbeRunner>,
}

impl IterationRunner {
    pub fn new(probe: Arc<dyn ProbeRunner>) -> Self {
        Self { probe }
    }

    /// Run until completion or the first failed iteration
    pub async fn run(
        &self,
        endpoint: &Endpoint,
        model: &ModelId,
        reporter: &dyn RunReporter,
        logger: &RunLogger,
    ) -> RunState {
        let mut state = RunState::start();

        while let RunState::Running(index) = state {
            reporter.iteration_started(index, ITERATIONS);
            let result = self.run_iteration(index, endpoint, model).await;

            logger.log_iteration(&result);
            reporter.iteration_finished(&result);

            state = state.advance(&result, ITERATIONS);
        }

        state
    }

    /// Send both requests for one iteration
    pub async fn run_iteration(&self, index: u32, endpoint: &Endpoint, model: &ModelId) -> IterationResult {
        let chat = self.send(RequestKind::Chat, endpoint, model).await;
        let completion = self.send(RequestKind::Completion, endpoint, model).await;

        IterationResult {
            index,
            chat,
            completion,
        }
    }

    async fn send(&self, kind: RequestKind, endpoint: &Endpoint, model: &ModelId) -> Outcome {
        let request = ProbeRequest::post_json(endpoint.url(kind.path()), kind.body(model));

        match self.probe.run(&request).await {
            Ok(out) => {
                debug!(request = %kind, exit_code = out.exit_code, "Probe finished");
                Outcome::classify(out.exit_code, &out.stdout)
            }
            Err(e) => Outcome::Failure {
                reason: format!("probe dispatch failed: {:#}", e),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::{exit, ok, ScriptedProbe};
    use crate::probe::HttpMethod;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        results: Mutex<Vec<IterationResult>>,
    }

    impl RunReporter for Recorder {
        fn iteration_finished(&self, result: &IterationResult) {
            self.results.lock().unwrap().push(result.clone());
        }
    }

    fn endpoint() -> Endpoint {
        Endpoint::new("10.0.0.5", 80).unwrap()
    }

    fn model() -> ModelId {
        ModelId::new("gpt-test").unwrap()
    }

    #[test]
    fn test_state_machine_transitions() {
        let pass = IterationResult {
            index: 1,
            chat: Outcome::classify(0, "{}"),
            completion: Outcome::classify(0, "{}"),
        };
        let fail = IterationResult {
            completion: Outcome::classify(0, ""),
            ..pass.clone()
        };

        assert_eq!(RunState::start().advance(&pass, 10), RunState::Running(2));
        assert_eq!(RunState::Running(10).advance(&pass, 10), RunState::Completed);
        assert_eq!(
            RunState::Running(4).advance(&fail, 10),
            RunState::Halted {
                iteration: 4,
                failures: vec!["completion: empty response body".into()],
            }
        );
        assert_eq!(RunState::Completed.advance(&fail, 10), RunState::Completed);
        assert!(RunState::Completed.is_terminal());
        assert!(!RunState::Running(3).is_terminal());
    }

    #[tokio::test]
    async fn test_all_iterations_pass() {
        let probe = Arc::new(ScriptedProbe::always(r#"{"id":"cmpl-1"}"#));
        let recorder = Recorder::default();

        let state = IterationRunner::new(probe.clone())
            .run(&endpoint(), &model(), &recorder, &RunLogger::new("llm-d"))
            .await;

        assert_eq!(state, RunState::Completed);
        assert_eq!(probe.call_count(), 20);
        let indices: Vec<u32> = recorder.results.lock().unwrap().iter().map(|r| r.index).collect();
        assert_eq!(indices, (1..=10).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_requests_alternate_chat_then_completion() {
        let probe = Arc::new(ScriptedProbe::always("{}"));
        IterationRunner::new(probe.clone())
            .run_iteration(1, &endpoint(), &model())
            .await;

        let requests = probe.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].method, HttpMethod::Post);
        assert_eq!(requests[0].url, "http://10.0.0.5:80/v1/chat/completions");
        assert_eq!(requests[0].body.as_ref().unwrap()["model"], "gpt-test");
        assert_eq!(requests[1].url, "http://10.0.0.5:80/v1/completions");
        assert_eq!(
            requests[1].body.as_ref().unwrap()["prompt"],
            "You are a helpful AI assistant."
        );
    }

    #[tokio::test]
    async fn test_halts_exactly_at_failing_iteration() {
        for n in 1..=ITERATIONS {
            for fail_chat in [true, false] {
                // Calls 2(n-1) and 2(n-1)+1 belong to iteration n
                let target = 2 * (n as usize - 1) + if fail_chat { 0 } else { 1 };
                let probe = Arc::new(ScriptedProbe::new(move |index, _| {
                    if index == target {
                        Ok(ok("error: timeout"))
                    } else {
                        Ok(ok("{}"))
                    }
                }));
                let recorder = Recorder::default();

                let state = IterationRunner::new(probe.clone())
                    .run(&endpoint(), &model(), &recorder, &RunLogger::new("llm-d"))
                    .await;

                assert!(matches!(state, RunState::Halted { iteration, .. } if iteration == n));
                assert_eq!(probe.call_count(), 2 * n as usize);
                assert_eq!(recorder.results.lock().unwrap().len(), n as usize);
            }
        }
    }

    #[tokio::test]
    async fn test_completion_still_sent_after_chat_failure() {
        let probe = Arc::new(ScriptedProbe::new(|index, _| {
            if index == 0 {
                Ok(exit(6))
            } else {
                Ok(ok("{}"))
            }
        }));

        let result = IterationRunner::new(probe.clone())
            .run_iteration(1, &endpoint(), &model())
            .await;

        assert_eq!(probe.call_count(), 2);
        assert!(!result.chat.is_success());
        assert!(result.completion.is_success());
    }

    #[tokio::test]
    async fn test_dispatch_error_is_request_failure() {
        let probe = Arc::new(ScriptedProbe::new(|_, _| Err(anyhow::anyhow!("image pull backoff"))));

        let result = IterationRunner::new(probe)
            .run_iteration(1, &endpoint(), &model())
            .await;

        assert_eq!(
            result.failures(),
            vec![
                "chat: probe dispatch failed: image pull backoff".to_string(),
                "completion: probe dispatch failed: image pull backoff".to_string(),
            ]
        );
    }
}
