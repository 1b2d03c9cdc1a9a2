//! CLI-specific error types
//!
//! Every CLI error is fatal: it is reported once and the process exits
//! non-zero.

use std::fmt;
use std::io;

use crate::config::ConfigError;
use crate::error::{ArcadeError, ErrorKind};

/// CLI error codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Configuration file error
    ConfigError,
    /// I/O error (stdin/stdout)
    IoError,
    /// Stdin did not hold the expected input
    InvalidInput,
    /// The driver reported an error
    Driver(ErrorKind),
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "ARCADE_CLI_CONFIG_ERROR",
            Self::IoError => "ARCADE_CLI_IO_ERROR",
            Self::InvalidInput => "ARCADE_CLI_INVALID_INPUT",
            Self::Driver(kind) => kind.code(),
        }
    }
}

/// CLI error
#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    /// Create a new CLI error
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Config error
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, msg)
    }

    /// I/O error
    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    /// Invalid stdin input
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::InvalidInput, msg)
    }

    /// Get the error code
    pub fn code(&self) -> &CliErrorCode {
        &self.code
    }

    /// Get the error code string
    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::invalid_input(format!("JSON error: {}", e))
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        Self::config_error(e.to_string())
    }
}

impl From<ArcadeError> for CliError {
    fn from(e: ArcadeError) -> Self {
        Self::new(CliErrorCode::Driver(e.kind()), e.to_string())
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_errors_keep_their_code() {
        let err = CliError::from(ArcadeError::validation("top_k must be a positive integer"));
        assert_eq!(err.code_str(), ErrorKind::Validation.code());
        assert_eq!(err.message(), "top_k must be a positive integer");
    }

    #[test]
    fn test_config_error_display() {
        let err = CliError::from(ConfigError::Read("missing".to_string()));
        assert_eq!(err.code(), &CliErrorCode::ConfigError);
        assert_eq!(
            err.to_string(),
            "ARCADE_CLI_CONFIG_ERROR: Failed to read config: missing"
        );
    }
}
