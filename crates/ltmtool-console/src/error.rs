//! Error types for the console link

use thiserror::Error;

/// Console link errors
#[derive(Debug, Error)]
pub enum ConsoleError {
    /// Serial port could not be opened or configured
    #[error("Serial port error: {0}")]
    SerialError(#[from] serialport::Error),

    /// I/O error during communication
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

impl From<ConsoleError> for ltmtool_core::Error {
    fn from(e: ConsoleError) -> Self {
        ltmtool_core::Error::Link(e.to_string())
    }
}

/// Result type for console operations
pub type Result<T> = std::result::Result<T, ConsoleError>;
