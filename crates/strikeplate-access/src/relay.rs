//! Door strike relay actuation.
//!
//! Every session owns one relay worker task holding the write handle of the
//! serial port. Door openings are requested through a [`RelayTrigger`] and
//! executed by the worker as a timed pulse (see [`RelayPulseSpec`]).
//!
//! # Architecture
//!
//! ```text
//! read task ──┐
//!             ├──> RelayTrigger ──(mpsc, capacity 1)──> worker ──> serial port
//! open_door ──┘          │                                 │
//!                        └────────── busy flag ────────────┘
//! ```
//!
//! At most one pulse is queued or running per session. A request arriving
//! while the relay is busy is rejected with [`PulseRequest::Busy`] instead
//! of being queued behind the running pulse.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use strikeplate_hardware::{AnySerialTransport, HardwareError, SerialTransport};
use strikeplate_protocol::{RelayPulseSpec, RelayStep, display_bytes};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// Result of a door-open request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PulseRequest {
    /// The pulse was handed to the worker.
    Started,

    /// A pulse is already queued or running; nothing was done.
    Busy,

    /// The worker has been shut down.
    Stopped,
}

/// Cloneable handle requesting relay pulses.
#[derive(Debug, Clone)]
pub struct RelayTrigger {
    tx: mpsc::Sender<()>,
    busy: Arc<AtomicBool>,
    stopped: Arc<AtomicBool>,
}

impl RelayTrigger {
    /// Request one door opening.
    ///
    /// Never waits for the pulse; the relay sequence runs on the worker.
    pub fn open_door(&self) -> PulseRequest {
        if self.stopped.load(Ordering::Acquire) {
            return PulseRequest::Stopped;
        }

        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return PulseRequest::Busy;
        }

        match self.tx.try_send(()) {
            Ok(()) => PulseRequest::Started,
            Err(mpsc::error::TrySendError::Full(())) => {
                self.busy.store(false, Ordering::Release);
                PulseRequest::Busy
            }
            Err(mpsc::error::TrySendError::Closed(())) => {
                self.busy.store(false, Ordering::Release);
                PulseRequest::Stopped
            }
        }
    }

    /// Returns `true` while a pulse is queued or running.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Owner of the relay worker task.
///
/// # Examples
///
/// ```
/// use strikeplate_access::{PulseRequest, RelayActuator};
/// use strikeplate_core::ReaderVariant;
/// use strikeplate_hardware::{AnySerialTransport, MockSerialPort};
/// use strikeplate_protocol::RelayPulseSpec;
///
/// #[tokio::main(flavor = "current_thread", start_paused = true)]
/// async fn main() {
///     let (port, handle) = MockSerialPort::new("/dev/ttyUSB0");
///     let spec = RelayPulseSpec::for_variant(ReaderVariant::Leser9);
///     let mut relay = RelayActuator::spawn(AnySerialTransport::Mock(port), spec, "/dev/ttyUSB0");
///
///     let trigger = relay.trigger();
///     assert_eq!(trigger.open_door(), PulseRequest::Started);
///     assert_eq!(trigger.open_door(), PulseRequest::Busy);
///
///     relay.shutdown().await;
///     assert_eq!(handle.written_commands(), vec![b"\x02R1\x04".to_vec(), b"\x02R0\x04".to_vec()]);
///     assert_eq!(trigger.open_door(), PulseRequest::Stopped);
/// }
/// ```
#[derive(Debug)]
pub struct RelayActuator {
    trigger: RelayTrigger,
    shutdown_tx: watch::Sender<bool>,
    worker: Option<JoinHandle<()>>,
    port: String,
}

impl RelayActuator {
    /// Spawn the worker on the current Tokio runtime.
    ///
    /// The worker owns `transport` and closes it when it stops.
    pub fn spawn(
        transport: AnySerialTransport,
        spec: RelayPulseSpec,
        port: impl Into<String>,
    ) -> Self {
        let port = port.into();
        let (tx, rx) = mpsc::channel(1);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let busy = Arc::new(AtomicBool::new(false));
        let stopped = Arc::new(AtomicBool::new(false));

        let worker = tokio::spawn(Self::worker(
            transport,
            spec,
            port.clone(),
            rx,
            Arc::clone(&busy),
            shutdown_rx,
        ));

        Self {
            trigger: RelayTrigger { tx, busy, stopped },
            shutdown_tx,
            worker: Some(worker),
            port,
        }
    }

    /// A new trigger for this relay.
    pub fn trigger(&self) -> RelayTrigger {
        self.trigger.clone()
    }

    /// Stop the worker.
    ///
    /// A pulse that is running or already accepted completes first. Every
    /// trigger returns [`PulseRequest::Stopped`] afterwards. Calling this
    /// again is a no-op.
    pub async fn shutdown(&mut self) {
        self.trigger.stopped.store(true, Ordering::Release);
        let _ = self.shutdown_tx.send(true);

        if let Some(worker) = self.worker.take()
            && let Err(e) = worker.await
            && !e.is_cancelled()
        {
            warn!("Relay worker for '{}' panicked: {}", self.port, e);
        }
    }

    async fn worker(
        mut transport: AnySerialTransport,
        spec: RelayPulseSpec,
        port: String,
        mut rx: mpsc::Receiver<()>,
        busy: Arc<AtomicBool>,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.changed() => break,
                request = rx.recv() => match request {
                    Some(()) => {
                        Self::run_pulse(&mut transport, &spec, &port).await;
                        busy.store(false, Ordering::Release);
                    }
                    None => break,
                },
            }
        }

        // A request accepted before the shutdown signal still runs.
        rx.close();
        while rx.try_recv().is_ok() {
            Self::run_pulse(&mut transport, &spec, &port).await;
            busy.store(false, Ordering::Release);
        }

        if let Err(e) = transport.close().await {
            warn!("Closing relay handle of '{}' failed: {}", port, e);
        }
        debug!("Relay worker for '{}' stopped", port);
    }

    async fn run_pulse(transport: &mut AnySerialTransport, spec: &RelayPulseSpec, port: &str) {
        debug!("Opening door on '{}'", port);
        if let Err(e) = Self::pulse(transport, spec, port).await {
            error!("Relay pulse on '{}' aborted: {}", port, e);
        }
    }

    async fn pulse(
        transport: &mut AnySerialTransport,
        spec: &RelayPulseSpec,
        port: &str,
    ) -> Result<(), HardwareError> {
        for step in spec.steps() {
            match step {
                RelayStep::Write(command) => {
                    debug!("Writing {} to '{}'", display_bytes(command), port);
                    transport.write_all(command).await?;
                    transport.flush().await?;
                }
                RelayStep::Hold(hold) => tokio::time::sleep(hold).await,
            }
        }
        Ok(())
    }
}

impl Drop for RelayActuator {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.abort();
        }
    }
}
