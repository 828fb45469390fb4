//! Error types for the printer library

use thiserror::Error;

/// A caller supplied a value the formatter cannot encode.
///
/// Raised before the offending escape sequence reaches the sink.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("invalid font '{value}' (expected A, B or C)")]
    InvalidFont { value: String },

    #[error("invalid alignment '{value}' (expected left, center or right)")]
    InvalidAlignment { value: String },

    #[error("invalid language '{value}'")]
    InvalidLanguage { value: String },

    #[error("invalid font size {width} x {height} (each must be 1-8)")]
    InvalidFontSize { width: i64, height: i64 },

    #[error("invalid value for '{key}': {value}")]
    InvalidNumber { key: String, value: String },

    #[error("missing required parameter '{key}'")]
    MissingParameter { key: String },

    #[error("invalid base64 payload: {reason}")]
    InvalidBase64 { reason: String },

    #[error("'{key}' is too long to encode ({len} bytes)")]
    PayloadTooLong { key: String, len: usize },
}

impl ConfigurationError {
    pub(crate) fn number(key: &str, value: &str) -> Self {
        Self::InvalidNumber {
            key: key.to_string(),
            value: value.to_string(),
        }
    }
}

/// Printer error types
#[derive(Debug, Error)]
pub enum PrintError {
    /// Caller configuration error (bad enum name, bad number, bad payload)
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigurationError),

    /// IO error from the output sink
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Node document could not be parsed
    #[error("Invalid node document: {0}")]
    Document(#[from] serde_json::Error),

    /// Image could not be loaded for rasterizing
    #[cfg(feature = "image")]
    #[error("Image error: {0}")]
    Image(String),

    /// Network connection error
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Timeout waiting for printer
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Invalid printer configuration
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Windows spooler error
    #[cfg(windows)]
    #[error("Windows printer error: {0}")]
    WindowsPrinter(String),
}

impl PrintError {
    /// The configuration error behind this failure, if any
    pub fn as_config(&self) -> Option<&ConfigurationError> {
        match self {
            Self::Config(e) => Some(e),
            _ => None,
        }
    }
}

/// Result type for printer operations
pub type PrintResult<T> = Result<T, PrintError>;
