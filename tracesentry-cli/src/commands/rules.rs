//! `tracesentry rules` command handler

use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use tracesentry_core::config::TraceSentryConfig;
use tracesentry_core::types::RiskTier;
use tracesentry_engine::load_catalog;
use tracesentry_engine::rule::{RuleLoader, builtin_specs};

use crate::cli::{RulesAction, RulesArgs};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `rules` command.
pub async fn execute(
    args: RulesArgs,
    config: &TraceSentryConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    match args.action {
        RulesAction::List { tier, rule_dir } => {
            let rule_dir = rule_dir.or_else(|| {
                (!config.monitor.rule_dir.is_empty())
                    .then(|| PathBuf::from(&config.monitor.rule_dir))
            });
            let report = list_rules(rule_dir.as_deref(), tier.map(RiskTier::from)).await?;
            writer.render(&report)
        }
        RulesAction::Validate { path } => {
            let report = validate_rules(&path).await?;
            writer.render(&report)?;
            if report.invalid > 0 {
                return Err(CliError::Command(format!(
                    "{} invalid rule file(s)",
                    report.invalid
                )));
            }
            Ok(())
        }
    }
}

/// Build the effective catalog and describe it.
async fn list_rules(
    rule_dir: Option<&Path>,
    tier: Option<RiskTier>,
) -> Result<RuleListReport, CliError> {
    info!(rule_dir = ?rule_dir, "loading rule catalog");
    let catalog = load_catalog(rule_dir).await?;
    let builtin: HashSet<String> = builtin_specs().into_iter().map(|s| s.id).collect();

    let rules: Vec<RuleEntry> = catalog
        .iter()
        .filter(|rule| tier.is_none_or(|t| rule.tier() == t))
        .map(|rule| RuleEntry {
            id: rule.id().to_owned(),
            tier: rule.tier(),
            message: rule.message().to_owned(),
            pattern: rule.spec().pattern.clone(),
            threshold: rule.threshold(),
            origin: if builtin.contains(rule.id()) {
                "builtin"
            } else {
                "custom"
            },
        })
        .collect();

    Ok(RuleListReport {
        total: rules.len(),
        rules,
    })
}

/// Validate each YAML file in a directory on its own.
async fn validate_rules(path: &Path) -> Result<RuleValidationReport, CliError> {
    info!(path = %path.display(), "validating rule files");
    let files = RuleLoader::yaml_files(path).await?;

    let mut seen: HashSet<String> = builtin_specs().into_iter().map(|s| s.id).collect();
    let mut report = RuleValidationReport {
        path: path.display().to_string(),
        total_files: files.len(),
        valid: 0,
        invalid: 0,
        rules: 0,
        errors: Vec::new(),
    };

    for file in &files {
        match RuleLoader::load_file(file).await {
            Ok(specs) => {
                let duplicates: Vec<String> = specs
                    .iter()
                    .filter(|spec| !seen.insert(spec.id.clone()))
                    .map(|spec| spec.id.clone())
                    .collect();
                if duplicates.is_empty() {
                    report.valid += 1;
                    report.rules += specs.len();
                } else {
                    report.invalid += 1;
                    report.errors.push(RuleError {
                        file: file.display().to_string(),
                        error: format!("duplicate rule id(s): {}", duplicates.join(", ")),
                    });
                }
            }
            Err(e) => {
                report.invalid += 1;
                report.errors.push(RuleError {
                    file: file.display().to_string(),
                    error: e.to_string(),
                });
            }
        }
    }

    Ok(report)
}

#[derive(Serialize)]
pub struct RuleListReport {
    pub total: usize,
    pub rules: Vec<RuleEntry>,
}

#[derive(Serialize)]
pub struct RuleEntry {
    pub id: String,
    pub tier: RiskTier,
    pub message: String,
    pub pattern: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold: Option<u64>,
    pub origin: &'static str,
}

impl Render for RuleListReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(
            w,
            "Detection Rules ({} total)",
            self.total.to_string().bold()
        )?;
        writeln!(w)?;
        writeln!(w, "{:<24} {:<8} {:<8} Message", "ID", "Tier", "Origin")?;
        writeln!(w, "{}", "-".repeat(90))?;

        for r in &self.rules {
            let tier = format!("{:<8}", r.tier.as_str());
            let tier_colored = match r.tier {
                RiskTier::High => tier.red(),
                RiskTier::Medium => tier.yellow(),
                RiskTier::Low => tier.normal(),
            };
            write!(w, "{:<24} {} {:<8} {}", r.id, tier_colored, r.origin, r.message)?;
            if let Some(threshold) = r.threshold {
                write!(w, " (threshold {threshold})")?;
            }
            writeln!(w)?;
        }

        Ok(())
    }
}

#[derive(Serialize)]
pub struct RuleValidationReport {
    pub path: String,
    pub total_files: usize,
    pub valid: usize,
    pub invalid: usize,
    pub rules: usize,
    pub errors: Vec<RuleError>,
}

#[derive(Serialize)]
pub struct RuleError {
    pub file: String,
    pub error: String,
}

impl Render for RuleValidationReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Rule Validation: {}", self.path.bold())?;
        writeln!(
            w,
            "  Files: {} total, {} valid, {} invalid ({} rules)",
            self.total_files,
            self.valid.to_string().green(),
            if self.invalid > 0 {
                self.invalid.to_string().red()
            } else {
                self.invalid.to_string().normal()
            },
            self.rules
        )?;

        if !self.errors.is_empty() {
            writeln!(w)?;
            writeln!(w, "Errors:")?;
            for e in &self.errors {
                writeln!(w, "  {}: {}", e.file.red(), e.error)?;
            }
        }

        Ok(())
    }
}
