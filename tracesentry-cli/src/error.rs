//! CLI-specific error types and exit code mapping

use tracesentry_core::error::TraceSentryError;
use tracesentry_engine::{EngineError, RunOutcome};

/// CLI-specific error type.
///
/// Each variant carries enough context for a user-friendly message.
/// The `exit_code()` method maps errors to process exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// The run stopped on a high-risk match with the abort policy enabled.
    #[error("{0}")]
    PolicyAbort(String),

    /// The traced target spawned more subprocesses than allowed.
    #[error("{0}")]
    CapExceeded(String),

    /// The tracer could not be started or no trace log could be opened.
    #[error("source unavailable: {0}")]
    SourceUnavailable(String),

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (file read, stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped domain error from tracesentry-core.
    #[error("{0}")]
    Core(#[from] TraceSentryError),

    /// Wrapped domain error from tracesentry-engine.
    #[error("{0}")]
    Engine(#[from] EngineError),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                                  |
    /// |------|------------------------------------------|
    /// | 0    | Success                                  |
    /// | 1    | General / command error                  |
    /// | 2    | Configuration error                      |
    /// | 3    | Aborted on high-risk detection           |
    /// | 4    | Subprocess cap exceeded                  |
    /// | 5    | Tracer or trace log unavailable          |
    /// | 10   | IO error                                 |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 2,
            Self::PolicyAbort(_) => 3,
            Self::CapExceeded(_) => 4,
            Self::SourceUnavailable(_) => 5,
            Self::Io(_) => 10,
            Self::Core(err) => match err {
                TraceSentryError::Config(_) => 2,
                TraceSentryError::Source(_) => 5,
                TraceSentryError::Io(_) => 10,
                TraceSentryError::Detection(_) => 1,
            },
            Self::Engine(err) => match err {
                EngineError::Config { .. } => 2,
                EngineError::SourceUnavailable(_) => 5,
                EngineError::Io(_) | EngineError::Sink { .. } => 10,
                EngineError::RuleLoad { .. }
                | EngineError::RuleValidation { .. }
                | EngineError::Regex(_)
                | EngineError::AuditTampering { .. } => 1,
            },
            Self::JsonSerialize(_) | Self::Command(_) => 1,
        }
    }

    /// Map a finished run to an error when it did not complete normally.
    pub fn from_outcome(outcome: &RunOutcome) -> Option<Self> {
        match outcome {
            RunOutcome::Completed => None,
            RunOutcome::PolicyAbort { .. } => Some(Self::PolicyAbort(outcome.to_string())),
            RunOutcome::CapExceeded { .. } => Some(Self::CapExceeded(outcome.to_string())),
        }
    }
}
