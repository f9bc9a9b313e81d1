//! `tracesentry analyze` command handler

use std::path::PathBuf;

use tracing::info;

use tracesentry_core::config::TraceSentryConfig;
use tracesentry_engine::Monitor;

use crate::cli::AnalyzeArgs;
use crate::commands::{PolicyOverrides, base_settings, finish_run};
use crate::error::CliError;
use crate::output::OutputWriter;

/// Execute the `analyze` command.
///
/// Classifies every log file whose name starts with the prefix. The prefix
/// defaults to `monitor.log_file` from the configuration.
pub async fn execute(
    args: AnalyzeArgs,
    config: &TraceSentryConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let prefix = match args.log_prefix {
        Some(prefix) => prefix,
        None if !config.monitor.log_file.is_empty() => PathBuf::from(&config.monitor.log_file),
        None => {
            return Err(CliError::Config(
                "no log prefix given and monitor.log_file is empty".to_owned(),
            ));
        }
    };

    let overrides = PolicyOverrides {
        terminate_on_high_risk: args.terminate_on_high_risk,
        subprocess_cap: args.subprocess_cap,
        rule_dir: args.rule_dir,
    };
    let settings = overrides.apply(base_settings(config)?).build()?;
    let monitor = Monitor::new(settings).await?;

    info!(prefix = %prefix.display(), "analyzing trace logs");
    let result = monitor.analyze(&prefix).await?;

    finish_run(&result, writer)
}
