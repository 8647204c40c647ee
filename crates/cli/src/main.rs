//! Gateway smoke tester
//!
//! Discovers a deployed inference gateway and its model, then runs ten
//! chat/completion iterations against it. Exits 0 when every iteration
//! passes and 1 otherwise, printing cluster diagnostics on failure.

mod output;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use smoke_lib::{EnvOverrides, RunConfig, SmokeTest, Transport, ITERATIONS};

use output::{ConsoleReporter, OutputFormat};

/// Gateway smoke tester
#[derive(Parser)]
#[command(name = "gateway-smoke")]
#[command(author, version, about = "Smoke-test a deployed inference gateway", long_about = None)]
pub struct Cli {
    /// Namespace of the gateway deployment [default: llm-d]
    #[arg(long, short)]
    pub namespace: Option<String>,

    /// Model to exercise (skips discovery)
    #[arg(long, short)]
    pub model: Option<String>,

    /// Echo underlying commands before running them
    #[arg(long, short)]
    pub verbose: bool,

    /// Path to kubeconfig file (kubectl's default if not specified)
    #[arg(long)]
    pub kubeconfig: Option<PathBuf>,

    /// Kubeconfig context to use
    #[arg(long)]
    pub context: Option<String>,

    /// Send requests from this host instead of an in-cluster probe pod
    #[arg(long)]
    pub direct: bool,

    /// Summary output format
    #[arg(long, short, default_value = "table")]
    pub format: OutputFormat,

    /// Emit log lines as JSON
    #[arg(long)]
    pub log_json: bool,
}

/// Filter used when RUST_LOG is unset
fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "debug"
    } else {
        "warn"
    }
}

fn init_tracing(verbose: bool, json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            output::print_error(&format!("{:#}", e));
            ExitCode::from(1)
        }
    }
}

/// Run the smoke test, returning whether every iteration passed
async fn run(cli: Cli) -> Result<bool> {
    let overrides = EnvOverrides::load()?;
    let transport = if cli.direct {
        Transport::Direct
    } else {
        Transport::Pod
    };

    let config = RunConfig::new(cli.namespace, cli.model, overrides)?
        .with_transport(transport)
        .with_kubeconfig(cli.kubeconfig)
        .with_context(cli.context)
        .with_verbose(cli.verbose);

    info!(namespace = %config.namespace, ?transport, "Configuration loaded");

    let smoke = SmokeTest::from_config(config)?;
    let reporter = ConsoleReporter::new(cli.format);
    reporter.print_header(&smoke.config().namespace);

    match smoke.run(&reporter).await {
        Ok(report) => {
            output::print_report(&report, cli.format);
            if matches!(cli.format, OutputFormat::Table) {
                output::print_success(&format!(
                    "All {} iterations passed, gateway is serving requests",
                    ITERATIONS
                ));
            }
            Ok(true)
        }
        Err(failure) => {
            output::print_error(&failure.error.to_string());
            if let Some(snapshot) = &failure.diagnostics {
                output::print_diagnostics(snapshot, cli.format);
            }
            output::print_report(&failure.report, cli.format);
            Ok(false)
        }
    }
}
