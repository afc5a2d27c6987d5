//! Enum wrapper for serial transport dispatch.
//!
//! Native `async fn` in traits (RPITIT - Rust Edition 2024) is not
//! object-safe, so `Box<dyn SerialTransport>` is not available. The session
//! holds an [`AnySerialTransport`] instead, which dispatches to the concrete
//! transport at compile time and keeps its futures `Send` for `tokio::spawn`.
//!
//! # Examples
//!
//! ```
//! use strikeplate_hardware::devices::AnySerialTransport;
//! use strikeplate_hardware::mock::MockSerialPort;
//! use strikeplate_hardware::traits::SerialTransport;
//!
//! let (port, _handle) = MockSerialPort::new("/dev/ttyUSB0");
//! let transport = AnySerialTransport::Mock(port);
//! assert_eq!(transport.name(), "/dev/ttyUSB0");
//! ```

use crate::Result;
use crate::mock::MockSerialPort;
use crate::serial::SystemSerialPort;
use crate::traits::SerialTransport;

/// Enum wrapper for serial transport dispatch.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnySerialTransport {
    /// Serial port of the host operating system.
    System(SystemSerialPort),

    /// Mock port for development and testing.
    Mock(MockSerialPort),
}

impl SerialTransport for AnySerialTransport {
    fn name(&self) -> &str {
        match self {
            Self::System(port) => port.name(),
            Self::Mock(port) => port.name(),
        }
    }

    async fn wait_readable(&mut self) -> Result<()> {
        match self {
            Self::System(port) => port.wait_readable().await,
            Self::Mock(port) => port.wait_readable().await,
        }
    }

    fn bytes_available(&mut self) -> Result<usize> {
        match self {
            Self::System(port) => port.bytes_available(),
            Self::Mock(port) => port.bytes_available(),
        }
    }

    async fn read_available(&mut self) -> Result<Vec<u8>> {
        match self {
            Self::System(port) => port.read_available().await,
            Self::Mock(port) => port.read_available().await,
        }
    }

    async fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        match self {
            Self::System(port) => port.write_all(bytes).await,
            Self::Mock(port) => port.write_all(bytes).await,
        }
    }

    async fn flush(&mut self) -> Result<()> {
        match self {
            Self::System(port) => port.flush().await,
            Self::Mock(port) => port.flush().await,
        }
    }

    fn try_clone(&self) -> Result<Self> {
        match self {
            Self::System(port) => port.try_clone().map(Self::System),
            Self::Mock(port) => port.try_clone().map(Self::Mock),
        }
    }

    async fn close(&mut self) -> Result<()> {
        match self {
            Self::System(port) => port.close().await,
            Self::Mock(port) => port.close().await,
        }
    }
}
