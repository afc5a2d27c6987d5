//! Mock serial port implementation for testing and development.
//!
//! This module provides a simulated serial port that can be controlled
//! programmatically: bytes are fed in through a handle as if a reader had
//! sent them, and everything written to the port is recorded with a
//! timestamp so relay timing can be asserted.

use crate::{
    Result,
    devices::AnySerialTransport,
    error::{HardwareError, OpenFailureKind},
    traits::{PortProvider, SerialTransport},
    types::{PortInfo, SerialSettings},
};
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;
use tokio::time::Instant;

/// One write observed on a mock port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRecord {
    /// When the write happened.
    pub at: Instant,

    /// The bytes written.
    pub bytes: Vec<u8>,
}

#[derive(Debug, Default)]
struct PortState {
    inbound: VecDeque<u8>,
    writes: Vec<WriteRecord>,
    flushes: usize,
    open_handles: usize,
    fail_writes: bool,
    disconnected: bool,
    settings: Option<SerialSettings>,
}

#[derive(Debug)]
struct Shared {
    name: String,
    state: Mutex<PortState>,
    data_ready: Notify,
}

impl Shared {
    fn new(name: String, open_handles: usize) -> Arc<Self> {
        Arc::new(Self {
            name,
            state: Mutex::new(PortState {
                open_handles,
                ..PortState::default()
            }),
            data_ready: Notify::new(),
        })
    }

    fn lock(&self) -> MutexGuard<'_, PortState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Mock serial port for testing and development.
///
/// # Examples
///
/// ```
/// use strikeplate_hardware::mock::MockSerialPort;
/// use strikeplate_hardware::traits::SerialTransport;
///
/// #[tokio::main]
/// async fn main() -> strikeplate_hardware::Result<()> {
///     let (mut port, handle) = MockSerialPort::new("/dev/ttyUSB0");
///
///     handle.feed(b"\x02RAB12EF34CD\x04");
///     port.wait_readable().await?;
///     assert_eq!(port.read_available().await?, b"\x02RAB12EF34CD\x04");
///
///     port.write_all(b"\x02R1\x04").await?;
///     assert_eq!(handle.written_commands(), vec![b"\x02R1\x04".to_vec()]);
///
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MockSerialPort {
    shared: Arc<Shared>,
    closed: bool,
}

impl MockSerialPort {
    /// Create a new, already open mock port.
    ///
    /// Returns a tuple of (MockSerialPort, MockSerialPortHandle) where the
    /// handle feeds input and inspects output.
    pub fn new(name: impl Into<String>) -> (Self, MockSerialPortHandle) {
        let shared = Shared::new(name.into(), 1);
        let port = Self {
            shared: Arc::clone(&shared),
            closed: false,
        };
        (port, MockSerialPortHandle { shared })
    }

    fn check_usable(&self, state: &PortState) -> Result<()> {
        if self.closed {
            return Err(HardwareError::closed(self.shared.name.clone()));
        }
        if state.disconnected {
            return Err(HardwareError::disconnected(self.shared.name.clone()));
        }
        Ok(())
    }

    fn release(&mut self) {
        if !self.closed {
            self.closed = true;
            let mut state = self.shared.lock();
            state.open_handles = state.open_handles.saturating_sub(1);
        }
    }
}

impl SerialTransport for MockSerialPort {
    fn name(&self) -> &str {
        &self.shared.name
    }

    async fn wait_readable(&mut self) -> Result<()> {
        loop {
            let notified = self.shared.data_ready.notified();
            {
                let state = self.shared.lock();
                self.check_usable(&state)?;
                if !state.inbound.is_empty() {
                    return Ok(());
                }
            }
            notified.await;
        }
    }

    fn bytes_available(&mut self) -> Result<usize> {
        let state = self.shared.lock();
        self.check_usable(&state)?;
        Ok(state.inbound.len())
    }

    async fn read_available(&mut self) -> Result<Vec<u8>> {
        let mut state = self.shared.lock();
        self.check_usable(&state)?;
        Ok(state.inbound.drain(..).collect())
    }

    async fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        let mut state = self.shared.lock();
        self.check_usable(&state)?;
        if state.fail_writes {
            return Err(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "mock write failure",
            )
            .into());
        }
        state.writes.push(WriteRecord {
            at: Instant::now(),
            bytes: bytes.to_vec(),
        });
        Ok(())
    }

    async fn flush(&mut self) -> Result<()> {
        let mut state = self.shared.lock();
        self.check_usable(&state)?;
        state.flushes += 1;
        Ok(())
    }

    fn try_clone(&self) -> Result<Self> {
        let mut state = self.shared.lock();
        self.check_usable(&state)?;
        state.open_handles += 1;
        Ok(Self {
            shared: Arc::clone(&self.shared),
            closed: false,
        })
    }

    async fn close(&mut self) -> Result<()> {
        self.release();
        Ok(())
    }
}

impl Drop for MockSerialPort {
    fn drop(&mut self) {
        self.release();
    }
}

/// Handle for controlling a mock serial port.
///
/// Cloning the handle yields another view of the same port.
#[derive(Debug, Clone)]
pub struct MockSerialPortHandle {
    shared: Arc<Shared>,
}

impl MockSerialPortHandle {
    /// Queue bytes as if the reader had sent them and signal data available.
    pub fn feed(&self, bytes: &[u8]) {
        self.shared.lock().inbound.extend(bytes.iter().copied());
        self.shared.data_ready.notify_waiters();
    }

    /// Simulate the device going away. Pending waits fail.
    pub fn disconnect(&self) {
        self.shared.lock().disconnected = true;
        self.shared.data_ready.notify_waiters();
    }

    /// Make every subsequent write fail (or succeed again).
    pub fn set_fail_writes(&self, fail: bool) {
        self.shared.lock().fail_writes = fail;
    }

    /// All recorded writes in order.
    pub fn writes(&self) -> Vec<WriteRecord> {
        self.shared.lock().writes.clone()
    }

    /// The bytes of all recorded writes in order.
    pub fn written_commands(&self) -> Vec<Vec<u8>> {
        self.shared
            .lock()
            .writes
            .iter()
            .map(|w| w.bytes.clone())
            .collect()
    }

    /// Number of flushes issued.
    pub fn flush_count(&self) -> usize {
        self.shared.lock().flushes
    }

    /// Bytes fed but not yet read.
    pub fn pending_input(&self) -> usize {
        self.shared.lock().inbound.len()
    }

    /// Number of open handles to this port.
    pub fn open_handles(&self) -> usize {
        self.shared.lock().open_handles
    }

    /// Returns `true` while any handle to the port is open.
    pub fn is_open(&self) -> bool {
        self.open_handles() > 0
    }

    /// Settings applied by the last successful open through [`MockPorts`].
    pub fn settings(&self) -> Option<SerialSettings> {
        self.shared.lock().settings.clone()
    }

    /// Port name.
    pub fn name(&self) -> &str {
        &self.shared.name
    }
}

#[derive(Debug)]
struct MockPortEntry {
    shared: Arc<Shared>,
    busy: bool,
    reject_settings: bool,
}

/// Mock port provider holding a set of named mock ports.
///
/// # Examples
///
/// ```
/// use strikeplate_hardware::mock::MockPorts;
/// use strikeplate_hardware::{HardwareError, PortProvider, SerialSettings};
///
/// let ports = MockPorts::new();
/// let handle = ports.add_port("/dev/ttyUSB0");
///
/// let transport = ports.open("/dev/ttyUSB0", &SerialSettings::new(9600)).unwrap();
/// assert!(handle.is_open());
///
/// let missing = ports.open("/dev/ttyS9", &SerialSettings::new(9600));
/// assert!(matches!(missing, Err(HardwareError::PortNotFound { .. })));
/// # drop(transport);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockPorts {
    ports: Arc<Mutex<BTreeMap<String, MockPortEntry>>>,
}

impl MockPorts {
    /// Create a provider without ports.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, MockPortEntry>> {
        self.ports.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a closed port and return its control handle.
    pub fn add_port(&self, name: impl Into<String>) -> MockSerialPortHandle {
        let name = name.into();
        let shared = Shared::new(name.clone(), 0);
        self.lock().insert(
            name,
            MockPortEntry {
                shared: Arc::clone(&shared),
                busy: false,
                reject_settings: false,
            },
        );
        MockSerialPortHandle { shared }
    }

    /// Simulate another process holding the port.
    pub fn set_busy(&self, name: &str, busy: bool) {
        if let Some(entry) = self.lock().get_mut(name) {
            entry.busy = busy;
        }
    }

    /// Make the port reject any line settings.
    pub fn set_reject_settings(&self, name: &str, reject: bool) {
        if let Some(entry) = self.lock().get_mut(name) {
            entry.reject_settings = reject;
        }
    }
}

impl PortProvider for MockPorts {
    fn available_ports(&self) -> Result<Vec<PortInfo>> {
        Ok(self
            .lock()
            .keys()
            .map(|name| PortInfo::new(name.clone()).with_product("Mock serial port"))
            .collect())
    }

    fn open(&self, name: &str, settings: &SerialSettings) -> Result<AnySerialTransport> {
        let ports = self.lock();
        let Some(entry) = ports.get(name) else {
            return Err(HardwareError::port_not_found(
                name,
                ports.keys().cloned().collect(),
            ));
        };

        let mut state = entry.shared.lock();
        if entry.busy || state.open_handles > 0 {
            return Err(HardwareError::port_open(
                name,
                OpenFailureKind::InUse,
                "port is held by another owner",
            ));
        }
        if entry.reject_settings {
            return Err(HardwareError::port_open(
                name,
                OpenFailureKind::UnsupportedSettings,
                format!("{} baud rejected", settings.baud_rate),
            ));
        }

        state.open_handles = 1;
        state.disconnected = false;
        state.settings = Some(settings.clone());

        Ok(AnySerialTransport::Mock(MockSerialPort {
            shared: Arc::clone(&entry.shared),
            closed: false,
        }))
    }
}
