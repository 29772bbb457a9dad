//! CLI error types.

use std::fmt;

use safepath::app::AppError;
use safepath::config::ConfigError;

/// Errors surfaced to the user by CLI commands.
#[derive(Debug)]
pub enum CliError {
    /// Configuration problem: unknown key, bad value, unreadable file.
    Config(String),

    /// Cache storage problem.
    Cache(String),

    /// Application bootstrap or shutdown failure.
    App(AppError),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Cache(msg) => write!(f, "Cache error: {}", msg),
            CliError::App(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::App(e) => Some(e),
            CliError::Config(_) | CliError::Cache(_) => None,
        }
    }
}

impl From<AppError> for CliError {
    fn from(e: AppError) -> Self {
        CliError::App(e)
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e.to_string())
    }
}
