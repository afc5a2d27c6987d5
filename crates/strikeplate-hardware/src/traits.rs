//! Serial transport trait definitions.
//!
//! These traits are the seam between the reader session and the serial port
//! supplied by the host platform. All asynchronous methods use native
//! `async fn` (Rust 1.90 + Edition 2024 RPITIT), so the traits are not
//! object-safe; dynamic dispatch goes through the enum wrapper in
//! [`devices`](crate::devices).

#![allow(async_fn_in_trait)]

use crate::devices::AnySerialTransport;
use crate::error::Result;
use crate::types::{PortInfo, SerialSettings};

/// Source of serial ports.
///
/// Separates port discovery and opening from the byte transport, so that a
/// session can enumerate ports, report what exists and open the one it was
/// configured for.
///
/// # Examples
///
/// ```no_run
/// use strikeplate_hardware::{PortProvider, SerialSettings, SystemPorts};
///
/// # fn example() -> strikeplate_hardware::Result<()> {
/// let ports = SystemPorts::new();
/// for port in ports.available_ports()? {
///     println!("{}", port.name);
/// }
/// let _transport = ports.open("/dev/ttyUSB0", &SerialSettings::new(9600))?;
/// # Ok(())
/// # }
/// ```
pub trait PortProvider: Send + Sync {
    /// Enumerate the serial ports currently present.
    ///
    /// # Errors
    ///
    /// Returns an error if the OS port list cannot be read.
    fn available_ports(&self) -> Result<Vec<PortInfo>>;

    /// Open a port exclusively and apply `settings`.
    ///
    /// # Errors
    ///
    /// Returns `PortNotFound` if no port has this name and
    /// `PortOpenFailure` if it is in use, rejects the settings or its
    /// streams cannot be acquired.
    fn open(&self, name: &str, settings: &SerialSettings) -> Result<AnySerialTransport>;
}

/// Byte-level access to an open serial port.
///
/// A transport is a handle; [`try_clone`](SerialTransport::try_clone) yields
/// a second handle to the same port so reading and writing can happen on
/// different tasks.
pub trait SerialTransport: Send {
    /// Name of the underlying port.
    fn name(&self) -> &str;

    /// Wait until at least one byte can be read.
    ///
    /// This is the data-available notification: it resolves once input is
    /// pending and never consumes bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the port disconnects or the handle was closed.
    async fn wait_readable(&mut self) -> Result<()>;

    /// Number of bytes that can be read without blocking.
    ///
    /// # Errors
    ///
    /// Returns an error if the port cannot be queried.
    fn bytes_available(&mut self) -> Result<usize>;

    /// Read every byte that is currently available, without waiting.
    ///
    /// Returns an empty vector if nothing is pending.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure.
    async fn read_available(&mut self) -> Result<Vec<u8>>;

    /// Write all bytes to the port.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure.
    async fn write_all(&mut self, bytes: &[u8]) -> Result<()>;

    /// Flush buffered output to the device.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure.
    async fn flush(&mut self) -> Result<()>;

    /// Open a second handle to the same port.
    ///
    /// # Errors
    ///
    /// Returns an error if the OS refuses to duplicate the handle.
    fn try_clone(&self) -> Result<Self>
    where
        Self: Sized;

    /// Release this handle.
    ///
    /// Closing an already closed handle is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if releasing the handle fails.
    async fn close(&mut self) -> Result<()>;
}
