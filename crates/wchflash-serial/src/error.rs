//! Error types for the serial transport

use thiserror::Error;

/// Errors that can occur while opening the serial link
///
/// Failures during an exchange are reported as
/// [`TransportError`](wchflash_core::TransportError) instead.
#[derive(Debug, Error)]
pub enum SerialError {
    /// Opening or configuring the port failed
    #[error("serial port error: {0}")]
    SerialError(#[from] serialport::Error),

    /// I/O error on the port
    #[error("I/O error: {0}")]
    IoError(String),
}

/// Result type for serial setup
pub type Result<T> = std::result::Result<T, SerialError>;

impl From<std::io::Error> for SerialError {
    fn from(e: std::io::Error) -> Self {
        SerialError::IoError(e.to_string())
    }
}
