//! `tracesentry monitor` command handler

use tracing::info;

use tracesentry_core::config::TraceSentryConfig;
use tracesentry_engine::monitor::AUDIT_OWNER;
use tracesentry_engine::{AuditHook, Monitor, MonitorSettings};

use crate::cli::MonitorArgs;
use crate::commands::{PolicyOverrides, base_settings, finish_run};
use crate::error::CliError;
use crate::output::OutputWriter;

/// Execute the `monitor` command.
pub async fn execute(
    args: MonitorArgs,
    config: &TraceSentryConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    if !args.script.is_file() {
        return Err(CliError::SourceUnavailable(format!(
            "target script not found: {}",
            args.script.display()
        )));
    }

    let script = args.script.clone();
    let settings = settings_from_args(args, config)?;
    let monitor = Monitor::new(settings).await?;

    info!(
        script = %script.display(),
        mode = %monitor.settings().mode,
        "starting monitor"
    );
    let result = monitor.run(&script).await?;

    if let Some(hook) = AuditHook::current().filter(|h| h.owner() == AUDIT_OWNER) {
        info!(findings = hook.findings().len(), "audit hook summary");
    }

    finish_run(&result, writer)
}

/// Merge CLI flags over the file/env configuration.
fn settings_from_args(
    args: MonitorArgs,
    config: &TraceSentryConfig,
) -> Result<MonitorSettings, CliError> {
    let mut builder = base_settings(config)?;
    if let Some(mode) = args.mode {
        builder = builder.mode(mode.into());
    }
    if let Some(logfile) = args.logfile {
        builder = builder.log_file(logfile);
    }
    if args.audit {
        builder = builder.audit(true);
    }

    let overrides = PolicyOverrides {
        terminate_on_high_risk: args.terminate_on_high_risk,
        subprocess_cap: args.subprocess_cap,
        rule_dir: args.rule_dir,
    };
    Ok(overrides.apply(builder).build()?)
}
