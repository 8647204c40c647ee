//! CLI integration tests

use std::process::{Command, Output};

/// Command for the built binary with a clean, cluster-less environment
fn smoke() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_gateway-smoke"));
    for (key, _) in std::env::vars() {
        if key.starts_with("GATEWAY_SMOKE_") {
            cmd.env_remove(key);
        }
    }
    cmd.env("HOME", "/nonexistent-home")
        .env("PATH", "")
        .env("NO_COLOR", "1");
    cmd
}

fn run(cmd: &mut Command) -> Output {
    cmd.output().expect("Failed to execute command")
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = run(smoke().arg("--help"));
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(stdout.contains("inference gateway"), "Should describe the tool");
    assert!(stdout.contains("--namespace"), "Should show namespace option");
    assert!(stdout.contains("--model"), "Should show model option");
    assert!(stdout.contains("--verbose"), "Should show verbose option");
    assert!(stdout.contains("--direct"), "Should show direct option");
    assert!(stdout.contains("llm-d"), "Should mention default namespace");
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let output = run(smoke().arg("--version"));
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("gateway-smoke"), "Should show binary name");
}

/// Test format option
#[test]
fn test_format_option() {
    let output = run(smoke().arg("-h"));
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(stdout.contains("--format"), "Should show format option");
    assert!(stdout.contains("table"), "Should show table format");
    assert!(stdout.contains("json"), "Should show json format");
}

/// Test invalid flag error handling
#[test]
fn test_invalid_flag() {
    let output = run(smoke().arg("--no-such-flag"));

    assert!(!output.status.success(), "Invalid flag should fail");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error"), "Should show error message");
}

/// Without kubectl no gateway can be discovered
#[test]
fn test_missing_gateway_exits_one() {
    let output = run(smoke().args(["--namespace", "smoke-test", "--model", "gpt-test"]));

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("no gateway address found in namespace 'smoke-test'"),
        "Should report the missing gateway, got: {}",
        stderr
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Diagnostics for namespace 'smoke-test'"));
    assert!(stdout.contains("Gateway logs"));
    assert!(
        stdout.contains("(unavailable)"),
        "Failed kubectl steps should be marked unavailable, got: {}",
        stdout
    );
}

/// An unreachable host fails the first iteration and stops there
#[test]
fn test_unreachable_host_fails_first_iteration() {
    let output = run(smoke()
        .env("GATEWAY_SMOKE_HOST", "127.0.0.1:1")
        .env("GATEWAY_SMOKE_REQUEST_TIMEOUT_SECS", "2")
        .args(["--direct", "--model", "gpt-test"]));

    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Iteration 1 failed"));
    assert!(!stdout.contains("Iteration 2/10"));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("iteration 1 failed"));
}

/// JSON summary carries the failure reason
#[test]
fn test_json_summary_on_failure() {
    let output = run(smoke()
        .env("GATEWAY_SMOKE_HOST", "127.0.0.1:1")
        .args(["--direct", "--model", "gpt-test", "--format", "json"]));

    assert_eq!(output.status.code(), Some(1));
    let report: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be a JSON report");
    assert_eq!(report["success"], false);
    assert_eq!(report["passed_iterations"], 0);
    assert_eq!(report["endpoint"]["port"], 1);
}
