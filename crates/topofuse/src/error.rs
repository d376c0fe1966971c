//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use topofuse_config::ConfigError;
use topofuse_core::CoreError;

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const CONFIG: i32 = 3;
    pub const NO_DATA: i32 = 4;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Configuration ────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(topofuse::validation))]
    Validation { field: String, reason: String },

    #[error("Could not load configuration from {path}")]
    #[diagnostic(
        code(topofuse::config),
        help("Check the TOML syntax and any TOPOFUSE_* environment overrides.")
    )]
    ConfigLoad {
        path: String,
        #[source]
        source: ConfigError,
    },

    #[error("No sources configured")]
    #[diagnostic(
        code(topofuse::no_sources),
        help(
            "Add at least one [sources.<name>] table, for example:\n\n\
             [sources.fw]\n\
             kind = \"switch_controller\"\n\
             url = \"https://192.0.2.1\"\n\
             token_env = \"FW_TOKEN\"\n\n\
             Expected at: {path}"
        )
    )]
    NoSources { path: String },

    // ── Engine ───────────────────────────────────────────────────────

    #[error("Every source failed; no topology could be built")]
    #[diagnostic(
        code(topofuse::no_data),
        help("Failed sources: {failed}\nRe-run with -v to see why each one failed.")
    )]
    NoData { failed: String },

    #[error("Cannot access {path}")]
    #[diagnostic(code(topofuse::io))]
    FileAccess {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Internal error: {message}")]
    #[diagnostic(code(topofuse::internal))]
    Internal { message: String },

    // ── IO / Serialization ───────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Could not render output: {message}")]
    #[diagnostic(code(topofuse::render))]
    Render { message: String },
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Validation { .. } => exit_code::USAGE,
            Self::ConfigLoad { .. } | Self::NoSources { .. } => exit_code::CONFIG,
            Self::NoData { .. } => exit_code::NO_DATA,
            _ => exit_code::GENERAL,
        }
    }

    pub fn config_load(path: &std::path::Path, source: ConfigError) -> Self {
        match source {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            source => Self::ConfigLoad {
                path: path.display().to_string(),
                source,
            },
        }
    }
}

// ── Library errors → CliError ────────────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            ConfigError::Io(e) => Self::Io(e),
            other => Self::Internal {
                message: other.to_string(),
            },
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Config { message } => Self::Validation {
                field: "engine".into(),
                reason: message,
            },
            CoreError::Io { path, source } => Self::FileAccess { path, source },
            CoreError::ShutDown => Self::Internal {
                message: "engine was shut down".into(),
            },
            CoreError::Internal(message) => Self::Internal { message },
        }
    }
}
