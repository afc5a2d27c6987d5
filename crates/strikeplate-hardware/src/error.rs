//! Error types for serial transport operations.
//!
//! This module defines error types specific to serial port handling,
//! covering port discovery, opening, disconnection and I/O failures.

use std::fmt;

/// Result type alias for hardware operations.
pub type Result<T> = std::result::Result<T, HardwareError>;

/// Why a serial port that exists could not be opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenFailureKind {
    /// Another process holds the port.
    InUse,

    /// The port rejected the requested line settings.
    UnsupportedSettings,

    /// The port opened but its read or write stream could not be acquired.
    StreamUnavailable,
}

impl fmt::Display for OpenFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InUse => write!(f, "in use"),
            Self::UnsupportedSettings => write!(f, "unsupported settings"),
            Self::StreamUnavailable => write!(f, "stream unavailable"),
        }
    }
}

/// Errors that can occur during serial transport operations.
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    /// The requested port is not among the enumerated serial ports.
    #[error(
        "Serial port '{port}' could not be found. Available ports are: [{}]",
        .available.join(", ")
    )]
    PortNotFound {
        port: String,
        available: Vec<String>,
    },

    /// The port exists but could not be opened and configured.
    #[error("Could not open serial port '{port}' ({kind}): {message}")]
    PortOpenFailure {
        port: String,
        kind: OpenFailureKind,
        message: String,
    },

    /// Device is not connected or has been disconnected.
    #[error("Device disconnected: {device}")]
    Disconnected { device: String },

    /// The transport handle was closed locally.
    #[error("Port closed: {device}")]
    Closed { device: String },

    /// Device communication error.
    #[error("Communication error: {message}")]
    CommunicationError { message: String },

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl HardwareError {
    /// Create a new port-not-found error listing the ports that do exist.
    pub fn port_not_found(port: impl Into<String>, available: Vec<String>) -> Self {
        Self::PortNotFound {
            port: port.into(),
            available,
        }
    }

    /// Create a new port-open failure.
    pub fn port_open(
        port: impl Into<String>,
        kind: OpenFailureKind,
        message: impl Into<String>,
    ) -> Self {
        Self::PortOpenFailure {
            port: port.into(),
            kind,
            message: message.into(),
        }
    }

    /// Create a new disconnected error.
    pub fn disconnected(device: impl Into<String>) -> Self {
        Self::Disconnected {
            device: device.into(),
        }
    }

    /// Create a new closed error.
    pub fn closed(device: impl Into<String>) -> Self {
        Self::Closed {
            device: device.into(),
        }
    }

    /// Create a new communication error.
    pub fn communication(message: impl Into<String>) -> Self {
        Self::CommunicationError {
            message: message.into(),
        }
    }

    /// Returns `true` for errors raised while opening a port.
    pub fn is_initialization(&self) -> bool {
        matches!(self, Self::PortNotFound { .. } | Self::PortOpenFailure { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_not_found_lists_ports() {
        let error = HardwareError::port_not_found(
            "/dev/ttyS9",
            vec!["/dev/ttyUSB0".to_string(), "/dev/ttyS0".to_string()],
        );
        assert!(error.is_initialization());
        assert_eq!(
            error.to_string(),
            "Serial port '/dev/ttyS9' could not be found. Available ports are: [/dev/ttyUSB0, /dev/ttyS0]"
        );
    }

    #[test]
    fn test_port_open_failure() {
        let error = HardwareError::port_open("/dev/ttyUSB0", OpenFailureKind::InUse, "busy");
        assert!(error.is_initialization());
        assert_eq!(
            error.to_string(),
            "Could not open serial port '/dev/ttyUSB0' (in use): busy"
        );
    }

    #[test]
    fn test_disconnected_error() {
        let error = HardwareError::disconnected("/dev/ttyUSB0");
        assert!(matches!(error, HardwareError::Disconnected { .. }));
        assert!(!error.is_initialization());
        assert_eq!(error.to_string(), "Device disconnected: /dev/ttyUSB0");
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe");
        let error: HardwareError = io.into();
        assert!(matches!(error, HardwareError::Io(_)));
    }
}
