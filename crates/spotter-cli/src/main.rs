// crates/spotter-cli/src/main.rs
// ============================================================================
// Module: Spotter CLI Entry Point
// Description: Command dispatcher for diagnosis runs and config utilities.
// Purpose: Run diagnosis jobs from a terminal and inspect their inputs.
// Dependencies: clap, spotter-config, spotter-service, tokio, tracing-subscriber
// ============================================================================

//! ## Overview
//! `spotter run` starts a diagnosis job, prints progress changes while it
//! runs, and prints the final report. Ctrl-C requests a cooperative shutdown;
//! a second Ctrl-C is ignored while the job winds down. The exit code is
//! non-zero unless the job finished.
//!
//! Building satellite brokers creates blocking HTTP clients, so every service
//! call that builds or drops brokers runs on the blocking pool.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use spotter_cli::logging::init_logging;
use spotter_cli::progress::ProgressPrinter;
use spotter_config::SpotterConfig;
use spotter_config::config_toml_example;
use spotter_config::hierarchy_toml_example;
use spotter_config::load_hierarchy;
use spotter_config::render_tree;
use spotter_core::DiagnosisReport;
use spotter_core::JobState;
use spotter_service::DiagnosisService;
use thiserror::Error;
use tracing::info;
use tracing::warn;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "spotter", version, about = "Performance problem diagnosis", disable_help_subcommand = true)]
struct Cli {
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a diagnosis job and print its report.
    Run(RunCommand),
    /// Validate the configuration, satellites, and hierarchy.
    Validate(ConfigArgs),
    /// Print the problem hierarchy a run would use.
    Hierarchy(ConfigArgs),
    /// Print an example configuration or hierarchy.
    Example(ExampleCommand),
}

/// Config path shared by subcommands.
#[derive(Args, Debug)]
struct ConfigArgs {
    /// Config file (defaults to `SPOTTER_CONFIG`, then `./spotter.toml`).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Arguments for `run`.
#[derive(Args, Debug)]
struct RunCommand {
    /// Config selection.
    #[command(flatten)]
    config: ConfigArgs,
    /// Progress poll interval in milliseconds.
    #[arg(long, value_name = "MS", default_value_t = 500, value_parser = clap::value_parser!(u64).range(10..))]
    poll_ms: u64,
    /// Print the final report as JSON instead of text.
    #[arg(long)]
    json: bool,
}

/// Arguments for `example`.
#[derive(Args, Debug)]
struct ExampleCommand {
    /// Example to print.
    #[arg(value_enum)]
    kind: ExampleKind,
}

/// Printable examples.
#[derive(ValueEnum, Copy, Clone, Debug)]
enum ExampleKind {
    /// `spotter.toml`.
    Config,
    /// Problem hierarchy TOML.
    Hierarchy,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for user-facing messages.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
async fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Run(command) => command_run(command).await,
        Commands::Validate(args) => command_validate(&args).await,
        Commands::Hierarchy(args) => command_hierarchy(&args),
        Commands::Example(command) => command_example(&command),
    }
}

// ============================================================================
// SECTION: Run Command
// ============================================================================

/// Executes the `run` command.
async fn command_run(command: RunCommand) -> CliResult<ExitCode> {
    let config = load_config(command.config.config.as_deref())?;
    let (service, job_id) = run_blocking(move || {
        let service = builtin_service()?;
        let job_id =
            service.start_with(&config).map_err(|err| CliError::new(format!("failed to start job: {err}")))?;
        Ok((service, job_id))
    })
    .await?;
    if job_id.is_none() {
        return Err(CliError::new("a diagnosis job is already running"));
    }
    info!(job = job_id.get(), poll_ms = command.poll_ms, "polling diagnosis progress");
    write_stdout(&format!("started diagnosis job {job_id}"))?;

    let mut printer = ProgressPrinter::new();
    let mut ticker = tokio::time::interval(Duration::from_millis(command.poll_ms));
    let mut interrupted = false;
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                for line in printer.changes(&service.progress()) {
                    write_stdout(&line)?;
                }
                if !service.is_running() {
                    break;
                }
            }
            signal = tokio::signal::ctrl_c(), if !interrupted => {
                interrupted = true;
                if let Err(err) = signal {
                    return Err(CliError::new(format!("failed to listen for ctrl-c: {err}")));
                }
                warn!(job = job_id.get(), "interrupted, requesting shutdown");
                write_stderr("shutdown requested, waiting for the current step to end")?;
                service.request_shutdown();
            }
        }
    }

    let waiter = service.clone();
    run_blocking(move || {
        waiter.wait();
        Ok(())
    })
    .await?;
    let report = service.last_report().ok_or_else(|| match service.last_run_error() {
        Some(err) => CliError::new(format!("diagnosis failed: {err}")),
        None => CliError::new("diagnosis ended without a report"),
    })?;
    print_report(&report, command.json)?;
    Ok(if report.state == JobState::Finished { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

/// Prints the final report.
fn print_report(report: &DiagnosisReport, json: bool) -> CliResult<()> {
    if json {
        let text = report.to_json().map_err(|err| CliError::new(format!("failed to serialize report: {err}")))?;
        return write_stdout(&text);
    }
    write_stdout(report.render_text().trim_end())
}

// ============================================================================
// SECTION: Inspection Commands
// ============================================================================

/// Executes the `validate` command.
async fn command_validate(args: &ConfigArgs) -> CliResult<ExitCode> {
    let config = load_config(args.config.as_deref())?;
    let summary = run_blocking(move || {
        builtin_service()?.validate(&config).map_err(|err| CliError::new(format!("validation failed: {err}")))
    })
    .await?;
    write_stdout(&format!(
        "config ok: {} satellite(s), {} problem(s), {} detectable",
        summary.satellites,
        summary.hierarchy.len(),
        summary.detectable
    ))?;
    Ok(ExitCode::SUCCESS)
}

/// Executes the `hierarchy` command.
fn command_hierarchy(args: &ConfigArgs) -> CliResult<ExitCode> {
    let config = load_config(args.config.as_deref())?;
    let hierarchy = load_hierarchy(config.hierarchy_path().as_deref());
    write_stdout(render_tree(&hierarchy).trim_end())?;
    Ok(ExitCode::SUCCESS)
}

/// Executes the `example` command.
fn command_example(command: &ExampleCommand) -> CliResult<ExitCode> {
    let text = match command.kind {
        ExampleKind::Config => config_toml_example(),
        ExampleKind::Hierarchy => hierarchy_toml_example(),
    };
    write_stdout(text.trim_end())?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Loads configuration and installs logging from it.
fn load_config(path: Option<&Path>) -> CliResult<SpotterConfig> {
    let config =
        DiagnosisService::load_config(path).map_err(|err| CliError::new(format!("failed to load config: {err}")))?;
    init_logging(&config.logging).map_err(|err| CliError::new(err.to_string()))?;
    Ok(config)
}

/// Creates a service with the built-in extensions.
fn builtin_service() -> CliResult<DiagnosisService> {
    DiagnosisService::with_builtins().map_err(|err| CliError::new(err.to_string()))
}

/// Runs synchronous service work on the blocking pool.
async fn run_blocking<T, F>(work: F) -> CliResult<T>
where
    F: FnOnce() -> CliResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work).await.map_err(|err| CliError::new(format!("blocking task failed: {err}")))?
}

/// Writes a line to stdout.
fn write_stdout(message: &str) -> CliResult<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}").map_err(|err| CliError::new(format!("failed to write to stdout: {err}")))
}

/// Writes a line to stderr.
fn write_stderr(message: &str) -> CliResult<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}").map_err(|err| CliError::new(format!("failed to write to stderr: {err}")))
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr(message);
    ExitCode::FAILURE
}
