// crates/source-gate-cli/src/main.rs
// ============================================================================
// Module: Source Gate CLI Entry Point
// Description: Command dispatcher for serving and config validation.
// Purpose: Start the authorizing proxy or check a configuration file.
// Dependencies: clap, source-gate-config, source-gate-proxy, tokio, tracing.
// ============================================================================

//! ## Overview
//! `source-gate serve` loads configuration, performs every startup-fatal
//! check, binds the proxy and metrics listeners, and runs until interrupted.
//! `source-gate check-config` loads and validates a configuration file
//! without binding anything. Startup-fatal errors print one line to stderr
//! and exit non-zero.

// ============================================================================
// SECTION: Modules
// ============================================================================


// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::ArgAction;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use source_gate_config::SourceGateConfig;
use source_gate_proxy::SourceGate;
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Environment variable holding the log filter directive.
const LOG_ENV: &str = "SOURCE_GATE_LOG";
/// Filter used when [`LOG_ENV`] is unset or invalid.
const DEFAULT_LOG_FILTER: &str = "info";

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "source-gate", disable_help_subcommand = true, disable_version_flag = true)]
struct Cli {
    /// Print version information and exit.
    #[arg(long = "version", action = ArgAction::SetTrue, global = true)]
    show_version: bool,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the authorizing proxy.
    Serve(ConfigArgs),
    /// Validate a configuration file and exit.
    CheckConfig(ConfigArgs),
}

/// Configuration file selection shared by every subcommand.
#[derive(Args, Debug)]
struct ConfigArgs {
    /// Config file path (defaults to `SOURCE_GATE_CONFIG`, then
    /// `source-gate.toml`).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper carrying a single-line message.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    const fn new(message: String) -> Self {
        Self {
            message,
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
    match run(Cli::parse()).await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
async fn run(cli: Cli) -> CliResult<ExitCode> {
    if cli.show_version {
        let version = env!("CARGO_PKG_VERSION");
        write_stdout_line(&format!("source-gate {version}"))
            .map_err(|err| CliError::new(format!("failed to write stdout: {err}")))?;
        return Ok(ExitCode::SUCCESS);
    }
    let Some(command) = cli.command else {
        return Err(CliError::new("no command given; try `source-gate --help`".to_string()));
    };
    match command {
        Commands::Serve(args) => command_serve(args).await,
        Commands::CheckConfig(args) => command_check_config(&args),
    }
}

// ============================================================================
// SECTION: Commands
// ============================================================================

/// Runs the proxy until interrupted.
async fn command_serve(args: ConfigArgs) -> CliResult<ExitCode> {
    init_logging();
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
    let config = load_config(&args)?;
    let gate = SourceGate::from_config(&config)
        .map_err(|err| CliError::new(format!("startup failed: {err}")))?;
    let running =
        gate.start().await.map_err(|err| CliError::new(format!("startup failed: {err}")))?;
    let metrics =
        running.metrics_addr().map_or_else(|| "disabled".to_string(), |addr| addr.to_string());
    info!(
        proxy = %running.proxy_addr(),
        backend = %config.server.backend_url,
        metrics = %metrics,
        "source gate ready"
    );
    shutdown_signal().await;
    info!("shutdown requested");
    running.shutdown().await.map_err(|err| CliError::new(format!("shutdown failed: {err}")))?;
    Ok(ExitCode::SUCCESS)
}

/// Validates configuration and prints a one-line summary.
fn command_check_config(args: &ConfigArgs) -> CliResult<ExitCode> {
    let config = load_config(args)?;
    write_stdout_line(&config_summary(&config))
        .map_err(|err| CliError::new(format!("failed to write stdout: {err}")))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Loads and validates configuration from the selected path.
fn load_config(args: &ConfigArgs) -> CliResult<SourceGateConfig> {
    SourceGateConfig::load(args.config.as_deref())
        .map_err(|err| CliError::new(format!("config load failed: {err}")))
}

/// Summarizes the effective configuration on one line.
fn config_summary(config: &SourceGateConfig) -> String {
    let tls = if config.server.tls.is_some() { "tls" } else { "plaintext" };
    let cache = config
        .ownership
        .cache_ttl()
        .map_or_else(|| "off".to_string(), |ttl| format!("{}ms", ttl.as_millis()));
    format!(
        "config ok: bind={} ({tls}) backend={} identity={} ownership={} cache={cache}",
        config.server.bind, config.server.backend_url, config.identity.url, config.ownership.url
    )
}

/// Builds the log filter from [`LOG_ENV`], falling back to the default.
fn log_filter(directive: Option<&str>) -> EnvFilter {
    directive
        .and_then(|value| EnvFilter::try_new(value).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}

/// Installs the application log subscriber on stderr.
fn init_logging() {
    let directive = std::env::var(LOG_ENV).ok();
    let _ = tracing_subscriber::fmt()
        .with_env_filter(log_filter(directive.as_deref()))
        .with_writer(std::io::stderr)
        .try_init();
}

/// Resolves when the process is asked to stop.
async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();
    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}

/// Writes a line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
