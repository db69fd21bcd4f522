//! copilot-usage - Copilot premium interaction usage monitor
//!
//! CLI entry point.

#![forbid(unsafe_code)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

use clap::Parser;
use std::process::ExitCode;

use copilot_usage::cli::{Cli, Commands, OutputFormat};
use copilot_usage::core::logging;
use copilot_usage::render::error::render_error;
use copilot_usage::storage::ResolvedConfig;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let watch_args = match &cli.command {
        Some(Commands::Watch(args)) => Some(args),
        _ => None,
    };
    let config = ResolvedConfig::resolve(&cli, watch_args);

    // Initialize logging
    let log_level = logging::LogLevel::resolve(
        cli.log_level.as_deref(),
        config.as_ref().ok().and_then(|c| c.log_level.as_deref()),
    );
    let log_format = if cli.json_output {
        logging::LogFormat::Json
    } else {
        logging::parse_log_format_from_env().unwrap_or_default()
    };
    logging::init(
        log_level,
        log_format,
        logging::parse_log_file_from_env(),
        cli.verbose,
    );

    // Errors before config resolution still honor --json.
    let (format, pretty) = match &config {
        Ok(config) => (config.format, config.pretty),
        Err(_) if cli.json => (OutputFormat::Json, cli.pretty),
        Err(_) => (cli.format, cli.pretty),
    };

    let result = match config {
        Ok(config) => run(cli.command, &config).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // The rendered error is the user-facing report; stderr must stay
            // a single JSON object in JSON mode.
            tracing::debug!(code = e.error_code(), "command failed: {e}");
            eprintln!("{}", render_error(&e, format, pretty));
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

async fn run(command: Option<Commands>, config: &ResolvedConfig) -> copilot_usage::Result<()> {
    tracing::debug!(
        interval = ?config.refresh_interval,
        interval_source = %config.sources.refresh_interval,
        timeout = ?config.timeout,
        timeout_source = %config.sources.timeout,
        settings = %config.settings_path.display(),
        "configuration resolved"
    );

    match command {
        // Default to a one-shot status
        None | Some(Commands::Status) => copilot_usage::cli::status::run_status(config).await,

        Some(Commands::Watch(_)) => copilot_usage::cli::watch::run_watch(config).await,

        Some(Commands::Endpoint(cmd)) => {
            copilot_usage::cli::endpoint::run_endpoint(&cmd, config).await
        }

        Some(Commands::Backend) => copilot_usage::cli::backend::run_backend(config).await,
    }
}
