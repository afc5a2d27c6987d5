//! Serial transport layer for the strikeplate reader engine.
//!
//! This crate provides the abstraction over the serial line a transponder
//! reader is attached to. The reader session only depends on the traits
//! defined here, so it runs unchanged against the ports of the host machine
//! or against the in-memory mock used for development and testing.
//!
//! # Design Philosophy
//!
//! - **Async-first**: I/O operations use native `async fn` in traits
//!   (Rust 1.90 + Edition 2024 RPITIT).
//! - **Enum dispatch**: the traits are not object-safe, so opened ports are
//!   returned as [`AnySerialTransport`].
//! - **Error-aware**: all operations return [`Result<T>`][error::Result]
//!   with a [`HardwareError`] that distinguishes a missing port from one
//!   that could not be opened.
//!
//! # Opening a port
//!
//! ```
//! use strikeplate_hardware::mock::MockPorts;
//! use strikeplate_hardware::{PortProvider, SerialSettings, SerialTransport};
//!
//! #[tokio::main]
//! async fn main() -> strikeplate_hardware::Result<()> {
//!     let ports = MockPorts::new();
//!     let handle = ports.add_port("/dev/ttyUSB0");
//!
//!     let mut transport = ports.open("/dev/ttyUSB0", &SerialSettings::new(9600))?;
//!     handle.feed(b"\x02RAB12EF34CD\x04");
//!
//!     transport.wait_readable().await?;
//!     let bytes = transport.read_available().await?;
//!     assert_eq!(bytes.len(), 13);
//!
//!     transport.close().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Thread Safety
//!
//! Transports are `Send` and a second handle can be obtained with
//! [`SerialTransport::try_clone`], so reading and writing can run on
//! separate Tokio tasks.

pub mod devices;
pub mod error;
pub mod mock;
pub mod serial;
pub mod traits;
pub mod types;

// Re-export commonly used types for convenience
pub use devices::AnySerialTransport;
pub use error::{HardwareError, OpenFailureKind, Result};
pub use mock::{MockPorts, MockSerialPort, MockSerialPortHandle, WriteRecord};
pub use serial::{SystemPorts, SystemSerialPort};
pub use traits::{PortProvider, SerialTransport};
pub use types::{Parity, PortInfo, SerialSettings};
