//! `tracesentry config` command handler

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use tracesentry_core::config::TraceSentryConfig;

use crate::cli::{ConfigAction, ConfigArgs};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `config` command.
///
/// Runs before the rest of the configuration is trusted, so it loads the
/// file itself instead of receiving an already validated config.
pub async fn execute(
    args: ConfigArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    match args.action {
        ConfigAction::Validate => execute_validate(config_path, writer).await,
        ConfigAction::Show { section } => execute_show(config_path, section, writer).await,
    }
}

/// Load and validate the configuration file, reporting any errors.
///
/// Unlike the other commands, a missing file is an error here.
async fn execute_validate(config_path: &Path, writer: &OutputWriter) -> Result<(), CliError> {
    info!(path = %config_path.display(), "validating configuration");

    let report = match TraceSentryConfig::load(config_path).await {
        Ok(_) => ConfigValidationReport {
            source: config_path.display().to_string(),
            valid: true,
            errors: Vec::new(),
        },
        Err(e) => ConfigValidationReport {
            source: config_path.display().to_string(),
            valid: false,
            errors: vec![e.to_string()],
        },
    };

    writer.render(&report)?;

    if !report.valid {
        return Err(CliError::Config("configuration is invalid".to_owned()));
    }

    Ok(())
}

/// Display the effective configuration (file + env overrides + defaults).
async fn execute_show(
    config_path: &Path,
    section: Option<String>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    info!(path = %config_path.display(), "loading configuration");

    let config = TraceSentryConfig::load_or_default(config_path).await?;
    let report = ConfigReport {
        source: config_path.display().to_string(),
        config_toml: section_toml(&config, section.as_deref())?,
        section,
    };

    writer.render(&report)?;

    Ok(())
}

fn section_toml(config: &TraceSentryConfig, section: Option<&str>) -> Result<String, CliError> {
    let rendered = match section {
        None => toml::to_string_pretty(config),
        Some("general") => toml::to_string_pretty(&config.general),
        Some("tracer") => toml::to_string_pretty(&config.tracer),
        Some("monitor") => toml::to_string_pretty(&config.monitor),
        Some(other) => {
            return Err(CliError::Command(format!(
                "unknown section: {other} (expected: general, tracer, monitor)"
            )));
        }
    };
    rendered.map_err(|e| CliError::Command(format!("failed to serialize configuration: {e}")))
}

/// Configuration display report.
///
/// The `config_toml` field is skipped during JSON serialization (only used for text rendering).
#[derive(Serialize)]
pub struct ConfigReport {
    /// Configuration file path
    pub source: String,
    /// Section filter, if any
    pub section: Option<String>,
    #[serde(skip)]
    pub config_toml: String,
}

impl Render for ConfigReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        match &self.section {
            Some(section) => writeln!(w, "# {} [{}]", self.source.bold(), section)?,
            None => writeln!(w, "# {}", self.source.bold())?,
        }
        write!(w, "{}", self.config_toml)?;
        Ok(())
    }
}

/// Configuration validation report.
#[derive(Serialize)]
pub struct ConfigValidationReport {
    pub source: String,
    pub valid: bool,
    pub errors: Vec<String>,
}

impl Render for ConfigValidationReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        if self.valid {
            writeln!(w, "{} {}", "valid:".green().bold(), self.source)?;
        } else {
            writeln!(w, "{} {}", "invalid:".red().bold(), self.source)?;
            for e in &self.errors {
                writeln!(w, "  - {e}")?;
            }
        }
        Ok(())
    }
}
