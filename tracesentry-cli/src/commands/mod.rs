//! Command handlers -- one module per subcommand

pub mod analyze;
pub mod config;
pub mod monitor;
pub mod rules;

use std::path::PathBuf;

use tracesentry_core::config::TraceSentryConfig;
use tracesentry_engine::{MonitorSettings, MonitorSettingsBuilder, RunResult};

use crate::error::CliError;
use crate::output::OutputWriter;

/// Policy flags shared by `monitor` and `analyze`.
#[derive(Debug, Default)]
pub(crate) struct PolicyOverrides {
    pub terminate_on_high_risk: bool,
    pub subprocess_cap: Option<u64>,
    pub rule_dir: Option<PathBuf>,
}

impl PolicyOverrides {
    /// Apply CLI flags on top of the file/env configuration.
    ///
    /// `--terminate-on-high-risk` can only enable the abort policy, never disable it.
    pub(crate) fn apply(self, builder: MonitorSettingsBuilder) -> MonitorSettingsBuilder {
        let mut builder = builder;
        if self.terminate_on_high_risk {
            builder = builder.terminate_on_high_risk(true);
        }
        if let Some(cap) = self.subprocess_cap {
            builder = builder.subprocess_cap(cap);
        }
        if let Some(dir) = self.rule_dir {
            builder = builder.rule_dir(dir);
        }
        builder
    }
}

/// Start from the loaded configuration as engine settings.
pub(crate) fn base_settings(config: &TraceSentryConfig) -> Result<MonitorSettingsBuilder, CliError> {
    let settings = MonitorSettings::from_core(config)?;
    Ok(MonitorSettingsBuilder::from_settings(settings))
}

/// Render a finished run, then map its outcome to the exit status.
pub(crate) fn finish_run(result: &RunResult, writer: &OutputWriter) -> Result<(), CliError> {
    writer.render(result)?;
    match CliError::from_outcome(&result.outcome) {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
