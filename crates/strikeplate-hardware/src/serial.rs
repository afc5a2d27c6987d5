//! Serial ports of the host operating system.
//!
//! Backed by the `serialport` crate. The crate offers no readiness
//! notification, so [`SystemSerialPort::wait_readable`] polls the input
//! queue at a fixed interval. Reads, writes and flushes block on the port
//! and run on the blocking thread pool.

use crate::devices::AnySerialTransport;
use crate::error::{HardwareError, OpenFailureKind, Result};
use crate::traits::{PortProvider, SerialTransport};
use crate::types::{Parity, PortInfo, SerialSettings};
use serialport::{SerialPort, SerialPortType};
use std::io::{self, Read, Write};
use std::time::Duration;
use tracing::{debug, trace};

/// Interval between input queue checks while waiting for data.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Port provider for the serial ports of this machine.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemPorts;

impl SystemPorts {
    /// Create a new provider.
    pub fn new() -> Self {
        Self
    }
}

impl PortProvider for SystemPorts {
    fn available_ports(&self) -> Result<Vec<PortInfo>> {
        let ports = serialport::available_ports()
            .map_err(|e| HardwareError::communication(format!("Cannot enumerate ports: {e}")))?;

        let mut infos: Vec<PortInfo> = ports
            .into_iter()
            .map(|info| {
                let port = PortInfo::new(info.port_name);
                match info.port_type {
                    SerialPortType::UsbPort(usb) => match usb.product {
                        Some(product) => port.with_product(product),
                        None => port,
                    },
                    _ => port,
                }
            })
            .collect();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(infos)
    }

    fn open(&self, name: &str, settings: &SerialSettings) -> Result<AnySerialTransport> {
        let data_bits = match settings.data_bits {
            5 => serialport::DataBits::Five,
            6 => serialport::DataBits::Six,
            7 => serialport::DataBits::Seven,
            8 => serialport::DataBits::Eight,
            other => {
                return Err(HardwareError::port_open(
                    name,
                    OpenFailureKind::UnsupportedSettings,
                    format!("{other} data bits"),
                ));
            }
        };
        let stop_bits = match settings.stop_bits {
            1 => serialport::StopBits::One,
            2 => serialport::StopBits::Two,
            other => {
                return Err(HardwareError::port_open(
                    name,
                    OpenFailureKind::UnsupportedSettings,
                    format!("{other} stop bits"),
                ));
            }
        };
        let parity = match settings.parity {
            Parity::None => serialport::Parity::None,
            Parity::Odd => serialport::Parity::Odd,
            Parity::Even => serialport::Parity::Even,
        };

        // Opened ports are exclusive on Unix (TIOCEXCL) and always on Windows.
        let port = serialport::new(name, settings.baud_rate)
            .data_bits(data_bits)
            .stop_bits(stop_bits)
            .parity(parity)
            .flow_control(serialport::FlowControl::None)
            .timeout(settings.open_timeout)
            .open()
            .map_err(|e| open_error(name, e, port_names))?;

        debug!(
            "Serial port '{}' opened at {} baud",
            name, settings.baud_rate
        );

        Ok(AnySerialTransport::System(SystemSerialPort {
            name: name.to_string(),
            port: Some(port),
        }))
    }
}

fn open_error(
    name: &str,
    error: serialport::Error,
    available: impl FnOnce() -> Vec<String>,
) -> HardwareError {
    let kind = match error.kind() {
        serialport::ErrorKind::NoDevice => OpenFailureKind::InUse,
        serialport::ErrorKind::InvalidInput => OpenFailureKind::UnsupportedSettings,
        serialport::ErrorKind::Io(io::ErrorKind::NotFound) => {
            return HardwareError::port_not_found(name, available());
        }
        serialport::ErrorKind::Io(io::ErrorKind::PermissionDenied) => OpenFailureKind::InUse,
        _ => OpenFailureKind::StreamUnavailable,
    };
    HardwareError::port_open(name, kind, error.to_string())
}

fn port_names() -> Vec<String> {
    SystemPorts
        .available_ports()
        .map(|ports| ports.into_iter().map(|port| port.name).collect())
        .unwrap_or_default()
}

/// `EIO`, reported by the tty layer once a USB adapter is unplugged.
#[cfg(unix)]
const EIO: i32 = 5;

/// Classify a failed input queue query on an open port.
///
/// On posix `serialport` reports every errno other than the few it names as
/// `Unknown`; on an open port that is the unplugged-device case.
fn poll_error(name: &str, error: serialport::Error) -> HardwareError {
    match error.kind() {
        serialport::ErrorKind::NoDevice
        | serialport::ErrorKind::Unknown
        | serialport::ErrorKind::Io(io::ErrorKind::BrokenPipe | io::ErrorKind::NotConnected) => {
            HardwareError::disconnected(name)
        }
        _ => HardwareError::communication(error.to_string()),
    }
}

/// Classify a failed read or write on an open port.
fn io_error(name: &str, error: io::Error) -> HardwareError {
    match error.kind() {
        io::ErrorKind::BrokenPipe | io::ErrorKind::NotConnected => {
            HardwareError::disconnected(name)
        }
        #[cfg(unix)]
        _ if error.raw_os_error() == Some(EIO) => HardwareError::disconnected(name),
        _ => HardwareError::Io(error),
    }
}

/// An open serial port of this machine.
pub struct SystemSerialPort {
    name: String,
    port: Option<Box<dyn SerialPort>>,
}

impl std::fmt::Debug for SystemSerialPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemSerialPort")
            .field("name", &self.name)
            .field("open", &self.port.is_some())
            .finish()
    }
}

impl SystemSerialPort {
    fn port(&mut self) -> Result<&mut Box<dyn SerialPort>> {
        self.port
            .as_mut()
            .ok_or_else(|| HardwareError::closed(self.name.clone()))
    }

    /// Run a blocking port operation on the blocking thread pool.
    ///
    /// The port moves into the blocking task and back. If the task panics
    /// the handle is lost and later calls report the port as closed.
    async fn blocking<T, F>(&mut self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut dyn SerialPort) -> io::Result<T> + Send + 'static,
    {
        let mut port = self
            .port
            .take()
            .ok_or_else(|| HardwareError::closed(self.name.clone()))?;

        let (port, result) = tokio::task::spawn_blocking(move || {
            let result = op(&mut *port);
            (port, result)
        })
        .await
        .map_err(|e| {
            HardwareError::communication(format!("I/O task for '{}' failed: {e}", self.name))
        })?;

        self.port = Some(port);
        result.map_err(|e| io_error(&self.name, e))
    }
}

impl SerialTransport for SystemSerialPort {
    fn name(&self) -> &str {
        &self.name
    }

    async fn wait_readable(&mut self) -> Result<()> {
        loop {
            if self.bytes_available()? > 0 {
                return Ok(());
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    fn bytes_available(&mut self) -> Result<usize> {
        let name = self.name.clone();
        let port = self.port()?;
        port.bytes_to_read()
            .map(|n| n as usize)
            .map_err(|e| poll_error(&name, e))
    }

    async fn read_available(&mut self) -> Result<Vec<u8>> {
        let pending = self.bytes_available()?;
        if pending == 0 {
            return Ok(Vec::new());
        }

        let buf = self
            .blocking(move |port| {
                let mut buf = vec![0u8; pending];
                match port.read(&mut buf) {
                    Ok(n) => {
                        buf.truncate(n);
                        Ok(buf)
                    }
                    Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(Vec::new()),
                    Err(e) => Err(e),
                }
            })
            .await?;

        trace!("Read {} bytes from '{}'", buf.len(), self.name);
        Ok(buf)
    }

    async fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        let bytes = bytes.to_vec();
        self.blocking(move |port| port.write_all(&bytes)).await
    }

    async fn flush(&mut self) -> Result<()> {
        self.blocking(|port| port.flush()).await
    }

    fn try_clone(&self) -> Result<Self> {
        let port = self
            .port
            .as_ref()
            .ok_or_else(|| HardwareError::closed(self.name.clone()))?;
        let clone = port.try_clone().map_err(|e| {
            HardwareError::port_open(
                self.name.clone(),
                OpenFailureKind::StreamUnavailable,
                e.to_string(),
            )
        })?;

        Ok(Self {
            name: self.name.clone(),
            port: Some(clone),
        })
    }

    async fn close(&mut self) -> Result<()> {
        if self.port.take().is_some() {
            debug!("Serial port handle '{}' closed", self.name);
        }
        Ok(())
    }
}
