//! Error types for the CLI.

use core_types::EcoError;
use std::fmt;

/// CLI-specific errors.
#[derive(Debug)]
pub enum CliError {
    /// Parse, evaluation, or bundling error
    EcoError(EcoError),

    /// File I/O error
    IoError(std::io::Error),

    /// REPL error
    ReplError(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::EcoError(e) => write!(f, "{}", e),
            CliError::IoError(e) => write!(f, "File error: {}", e),
            CliError::ReplError(s) => write!(f, "REPL error: {}", s),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::IoError(e) => Some(e),
            CliError::EcoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<EcoError> for CliError {
    fn from(err: EcoError) -> Self {
        CliError::EcoError(err)
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::IoError(err)
    }
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;
