//! In-memory stand-ins for the cluster and probes

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::Mutex;
use tokio::time::Instant;

use crate::cluster::{ClusterCli, CommandOutput};
use crate::probe::{ProbeOutput, ProbeRequest, ProbeRunner};

enum Reply {
    Output(CommandOutput),
    Error(String),
}

/// Cluster that answers commands from substring rules, first match wins
pub struct ScriptedCluster {
    rules: Mutex<Vec<(String, Reply)>>,
    calls: Mutex<Vec<Vec<String>>>,
}

impl ScriptedCluster {
    pub fn new() -> Self {
        Self {
            rules: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn respond(&self, pattern: &str, output: CommandOutput) {
        self.rules
            .lock()
            .unwrap()
            .push((pattern.to_string(), Reply::Output(output)));
    }

    pub fn respond_ok(&self, pattern: &str, stdout: &str) {
        self.respond(
            pattern,
            CommandOutput {
                status: 0,
                stdout: stdout.to_string(),
                stderr: String::new(),
            },
        );
    }

    pub fn fail(&self, pattern: &str, message: &str) {
        self.rules
            .lock()
            .unwrap()
            .push((pattern.to_string(), Reply::Error(message.to_string())));
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_starting_with(&self, verb: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.first().map(String::as_str) == Some(verb))
            .count()
    }
}

#[async_trait]
impl ClusterCli for ScriptedCluster {
    async fn run(&self, args: &[String]) -> Result<CommandOutput> {
        self.calls.lock().unwrap().push(args.to_vec());
        let joined = args.join(" ");

        let rules = self.rules.lock().unwrap();
        match rules.iter().find(|(pattern, _)| joined.contains(pattern.as_str())) {
            Some((_, Reply::Output(out))) => Ok(out.clone()),
            Some((_, Reply::Error(msg))) => Err(anyhow!(msg.clone())),
            None => Ok(CommandOutput {
                status: 1,
                stdout: String::new(),
                stderr: format!("error: the server doesn't have a resource type for '{}'", joined),
            }),
        }
    }
}

type Responder = dyn Fn(usize, &ProbeRequest) -> Result<ProbeOutput> + Send + Sync;

/// Probe whose answers come from a closure over the call index
pub struct ScriptedProbe {
    responder: Box<Responder>,
    calls: Mutex<Vec<(Instant, ProbeRequest)>>,
}

impl ScriptedProbe {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(usize, &ProbeRequest) -> Result<ProbeOutput> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Probe that answers every request with the same JSON body
    pub fn always(body: &str) -> Self {
        let body = body.to_string();
        Self::new(move |_, _| Ok(ok(&body)))
    }

    pub fn requests(&self) -> Vec<ProbeRequest> {
        self.calls.lock().unwrap().iter().map(|(_, r)| r.clone()).collect()
    }

    pub fn instants(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().iter().map(|(t, _)| *t).collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ProbeRunner for ScriptedProbe {
    async fn run(&self, request: &ProbeRequest) -> Result<ProbeOutput> {
        let index = {
            let mut calls = self.calls.lock().unwrap();
            calls.push((Instant::now(), request.clone()));
            calls.len() - 1
        };
        (self.responder)(index, request)
    }
}

pub fn ok(body: &str) -> ProbeOutput {
    ProbeOutput {
        exit_code: 0,
        stdout: body.to_string(),
    }
}

pub fn exit(code: i32) -> ProbeOutput {
    ProbeOutput {
        exit_code: code,
        stdout: String::new(),
    }
}
