//! # Error Types
//!
//! Custom error types for Omnimote using `thiserror`.
//!
//! Construction-time errors ([`RemoteError::InvalidCalibration`],
//! [`RemoteError::Config`], [`RemoteError::Input`]) abort startup. Per-tick
//! errors ([`RemoteError::SensorReadFailure`], [`RemoteError::Encoding`],
//! [`RemoteError::RadioUnavailable`]) are logged by the transmit loop and
//! never escape it.

use thiserror::Error;

/// Main error type for Omnimote
#[derive(Debug, Error)]
pub enum RemoteError {
    /// Axis calibration bounds are degenerate or out of order
    #[error("Invalid calibration: low={low}, high={high}")]
    InvalidCalibration { low: f64, high: f64 },

    /// Reading an analog channel failed
    #[error("Sensor read failure on channel {channel}: {reason}")]
    SensorReadFailure { channel: u8, reason: String },

    /// A command field was not a finite number
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// The radio link refused a frame (inactive, disposed or closed)
    #[error("Radio unavailable: {0}")]
    RadioUnavailable(String),

    /// Lifecycle call made in the wrong state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Digital input setup errors
    #[error("Input error: {0}")]
    Input(String),

    /// Serial port errors
    #[error("Serial error: {0}")]
    Serial(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RemoteError {
    /// Returns true for errors that only cost a single tick.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::SensorReadFailure { .. } | Self::Encoding(_) | Self::RadioUnavailable(_)
        )
    }
}

/// Result type alias for Omnimote
pub type Result<T> = std::result::Result<T, RemoteError>;
