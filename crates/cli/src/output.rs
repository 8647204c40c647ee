//! Console output for smoke-test runs

use clap::ValueEnum;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use smoke_lib::{
    DiagnosticSnapshot, Endpoint, IterationResult, ModelId, ModelSource, Outcome, RunReport,
    RunReporter,
};

/// Output format for the run summary
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Prints progress as the run advances
///
/// In JSON mode progress is suppressed so stdout carries only the report.
pub struct ConsoleReporter {
    format: OutputFormat,
}

impl ConsoleReporter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    fn enabled(&self) -> bool {
        matches!(self.format, OutputFormat::Table)
    }

    pub fn print_header(&self, namespace: &str) {
        if self.enabled() {
            println!("{}", "Gateway Smoke Test".bold());
            println!("{}", "=".repeat(50));
            println!("Namespace:  {}", namespace.cyan());
        }
    }
}

impl RunReporter for ConsoleReporter {
    fn endpoint_resolved(&self, endpoint: &Endpoint) {
        if self.enabled() {
            println!("Endpoint:   {}", endpoint.to_string().cyan());
        }
    }

    fn model_resolved(&self, model: &ModelId, source: ModelSource) {
        if self.enabled() {
            println!("Model:      {} ({})", model.as_str().cyan(), source);
            println!();
        }
    }

    fn iteration_started(&self, index: u32, total: u32) {
        if self.enabled() {
            print_info(&format!("Iteration {}/{}", index, total));
        }
    }

    fn iteration_finished(&self, result: &IterationResult) {
        if !self.enabled() {
            return;
        }

        for (label, outcome) in [("chat", &result.chat), ("completion", &result.completion)] {
            match outcome {
                Outcome::Success { body } => {
                    println!("  {} {:<11} {}", "✓".green(), label, preview(body));
                }
                Outcome::Failure { reason } => {
                    println!("  {} {:<11} {}", "✗".red(), label, reason.red());
                }
            }
        }

        if result.passed() {
            print_success(&format!("Iteration {} passed", result.index));
        } else {
            print_warning(&format!("Iteration {} failed", result.index));
        }
    }
}

/// First line of a response body, shortened for display
fn preview(body: &str) -> String {
    const MAX: usize = 80;
    let line = body.lines().next().unwrap_or("").trim();
    if line.chars().count() > MAX {
        let cut: String = line.chars().take(MAX).collect();
        format!("{}…", cut)
    } else {
        line.to_string()
    }
}

#[derive(Tabled)]
struct ReportRow {
    #[tabled(rename = "Field")]
    field: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

/// Print the run summary
pub fn print_report(report: &RunReport, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            if let Ok(json) = serde_json::to_string_pretty(report) {
                println!("{}", json);
            }
        }
        OutputFormat::Table => {
            let dash = || "-".to_string();
            let rows = vec![
                ReportRow {
                    field: "Namespace",
                    value: report.namespace.clone(),
                },
                ReportRow {
                    field: "Endpoint",
                    value: report.endpoint.as_ref().map(|e| e.to_string()).unwrap_or_else(dash),
                },
                ReportRow {
                    field: "Model",
                    value: match (&report.model, report.model_source) {
                        (Some(model), Some(source)) => format!("{} ({})", model, source),
                        (Some(model), None) => model.to_string(),
                        _ => dash(),
                    },
                },
                ReportRow {
                    field: "Iterations",
                    value: format!("{}/{}", report.passed_iterations, report.iterations),
                },
                ReportRow {
                    field: "Result",
                    value: if report.success {
                        "passed".green().to_string()
                    } else {
                        "failed".red().to_string()
                    },
                },
                ReportRow {
                    field: "Duration",
                    value: format_duration(report),
                },
            ];

            println!();
            let table = Table::new(rows).with(Style::rounded()).to_string();
            println!("{}", table);
        }
    }
}

fn format_duration(report: &RunReport) -> String {
    let elapsed = report.finished_at - report.started_at;
    format!("{:.1}s", elapsed.num_milliseconds() as f64 / 1000.0)
}

/// Print a diagnostic snapshot
///
/// When stdout carries JSON the plain rendering goes to stderr instead.
pub fn print_diagnostics(snapshot: &DiagnosticSnapshot, format: OutputFormat) {
    if matches!(format, OutputFormat::Json) {
        eprint!("\n{}", snapshot);
        return;
    }

    println!();
    println!(
        "{}",
        format!("Diagnostics for namespace '{}'", snapshot.namespace).bold()
    );
    println!("{}", "=".repeat(50));

    for section in &snapshot.sections {
        let title = if section.captured {
            section.title.bold().to_string()
        } else {
            format!("{} {}", section.title, "(unavailable)".yellow()).bold().to_string()
        };
        println!();
        println!("{}", title);
        println!("{}", "-".repeat(50));
        println!("{}", section.body.trim_end());
    }
}
