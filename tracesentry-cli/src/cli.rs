//! CLI argument parsing using clap derive API
//!
//! This module defines the command-line interface structure using clap's derive macros.
//! It is purely declarative with no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracesentry_core::types::RiskTier;
use tracesentry_engine::MonitorMode;

/// TraceSentry -- syscall trace risk monitor.
///
/// Use `tracesentry <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "tracesentry", version, about, long_about = None)]
pub struct Cli {
    /// Path to the tracesentry.toml configuration file.
    #[arg(short, long, default_value = "tracesentry.toml", global = true)]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable report text.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a target under the tracer and classify its syscalls.
    Monitor(MonitorArgs),

    /// Classify existing trace logs without launching a tracer.
    Analyze(AnalyzeArgs),

    /// Inspect and validate detection rules.
    Rules(RulesArgs),

    /// Manage configuration.
    Config(ConfigArgs),
}

// ---- monitor ----

/// Monitoring mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    /// Trace to completion, then analyze the log files.
    Once,
    /// Classify tracer output as it arrives.
    Realtime,
}

impl From<ModeArg> for MonitorMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Once => MonitorMode::Once,
            ModeArg::Realtime => MonitorMode::Realtime,
        }
    }
}

/// Run a target script under the tracer.
#[derive(Args, Debug)]
pub struct MonitorArgs {
    /// Path to the target script.
    #[arg(long)]
    pub script: PathBuf,

    /// Trace log path (once: output prefix, realtime: mirror file).
    #[arg(long)]
    pub logfile: Option<PathBuf>,

    /// Monitoring mode (default from config: once).
    #[arg(long)]
    pub mode: Option<ModeArg>,

    /// Abort on the first high-risk detection.
    #[arg(long)]
    pub terminate_on_high_risk: bool,

    /// Maximum tolerated subprocess spawns.
    #[arg(long)]
    pub subprocess_cap: Option<u64>,

    /// Directory with additional YAML rules.
    #[arg(long)]
    pub rule_dir: Option<PathBuf>,

    /// Enable the interpreter-event audit hook.
    #[arg(long)]
    pub audit: bool,
}

// ---- analyze ----

/// Classify pre-existing trace logs matched by a path prefix.
#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Trace log path prefix (default from config: trace.log).
    pub log_prefix: Option<PathBuf>,

    /// Abort on the first high-risk detection.
    #[arg(long)]
    pub terminate_on_high_risk: bool,

    /// Maximum tolerated subprocess spawns.
    #[arg(long)]
    pub subprocess_cap: Option<u64>,

    /// Directory with additional YAML rules.
    #[arg(long)]
    pub rule_dir: Option<PathBuf>,
}

// ---- rules ----

/// Rule tier filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TierArg {
    High,
    Medium,
    Low,
}

impl From<TierArg> for RiskTier {
    fn from(tier: TierArg) -> Self {
        match tier {
            TierArg::High => RiskTier::High,
            TierArg::Medium => RiskTier::Medium,
            TierArg::Low => RiskTier::Low,
        }
    }
}

/// Inspect and validate detection rules.
#[derive(Args, Debug)]
pub struct RulesArgs {
    #[command(subcommand)]
    pub action: RulesAction,
}

#[derive(Subcommand, Debug)]
pub enum RulesAction {
    /// List the effective rule catalog (built-in plus configured rule directory).
    List {
        /// Show only one tier.
        #[arg(long)]
        tier: Option<TierArg>,

        /// Directory with additional YAML rules (overrides config).
        #[arg(long)]
        rule_dir: Option<PathBuf>,
    },
    /// Validate YAML rule files without running a monitor.
    Validate {
        /// Directory containing YAML rule files.
        path: PathBuf,
    },
}

// ---- config ----

/// Manage tracesentry configuration.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors.
    Validate,
    /// Show the effective configuration (file + env overrides + defaults).
    Show {
        /// Show only a specific section (general, tracer, monitor).
        #[arg(long)]
        section: Option<String>,
    },
}
