//! tracesentry -- run a target under a syscall tracer and report risky behaviour.

mod cli;
mod commands;
mod error;
mod logging;
mod output;

use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;

use tracesentry_core::config::{GeneralConfig, TraceSentryConfig};

use crate::cli::{Cli, Commands};
use crate::error::CliError;
use crate::output::OutputWriter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let writer = OutputWriter::new(cli.output);

    match run(cli, &writer).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::debug!(error = ?err, "command failed");
            eprintln!("{} {err}", "error:".red().bold());
            ExitCode::from(u8::try_from(err.exit_code()).unwrap_or(1))
        }
    }
}

async fn run(cli: Cli, writer: &OutputWriter) -> Result<(), CliError> {
    // `config` inspects the file itself, so it cannot depend on it for logging
    if let Commands::Config(args) = cli.command {
        init_logging(&GeneralConfig::default(), cli.log_level);
        return commands::config::execute(args, &cli.config, writer).await;
    }

    let config = TraceSentryConfig::load_or_default(&cli.config).await?;
    init_logging(&config.general, cli.log_level);
    tracing::debug!(config = %cli.config.display(), "configuration loaded");

    match cli.command {
        Commands::Monitor(args) => commands::monitor::execute(args, &config, writer).await,
        Commands::Analyze(args) => commands::analyze::execute(args, &config, writer).await,
        Commands::Rules(args) => commands::rules::execute(args, &config, writer).await,
        // handled above
        Commands::Config(_) => Ok(()),
    }
}

fn init_logging(general: &GeneralConfig, level_override: Option<String>) {
    let mut general = general.clone();
    if let Some(level) = level_override {
        general.log_level = level;
    }
    if let Err(e) = logging::init_tracing(&general) {
        eprintln!("{} {e:#}", "warning:".yellow().bold());
    }
}
