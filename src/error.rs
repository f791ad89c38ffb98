//! # Error Types
//!
//! Custom error types for MVMP Bridge using `thiserror`.

use std::time::Duration;

use thiserror::Error;

use crate::mvmp::protocol::{DecodeError, EncodeError};

/// Main error type for MVMP Bridge
#[derive(Debug, Error)]
pub enum MvmpError {
    /// Response frame could not be validated or decoded
    #[error("MVMP decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Outbound command could not be built
    #[error("MVMP encode error: {0}")]
    Encode(#[from] EncodeError),

    /// No response arrived within the bounded poll window
    #[error("Timed out waiting for response after {attempts} checks ({waited:?})")]
    Timeout { attempts: u32, waited: Duration },

    /// Serial port errors
    #[error("Serial error: {0}")]
    Serial(String),

    /// None of the candidate device paths could be opened
    #[error("No MPPT serial device found (tried: {0})")]
    SerialPortNotFound(String),

    /// Telemetry sink errors
    #[error("Sink error: {0}")]
    Sink(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for MVMP Bridge
pub type Result<T> = std::result::Result<T, MvmpError>;
