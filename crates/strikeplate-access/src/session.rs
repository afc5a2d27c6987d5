//! Reader session: one serial port, one reader.
//!
//! A session owns the serial port of a reader and runs two tasks on it:
//!
//! - the **read task**, which waits for input, collects a burst of bytes
//!   until the line goes idle and feeds it through the access pipeline
//! - the **relay worker** (see [`relay`](crate::relay)), which owns the
//!   second handle of the port and drives the door strike
//!
//! # Access Pipeline
//!
//! ```text
//! bytes ──> FrameParser ──> DebounceGate ──> AuthorizationResolver
//!                                                   │
//!          ┌────────────────────────────────────────┘
//!          ├─ Authorized, enabled   ──> relay pulse + "OK|t|u|r"
//!          ├─ Authorized, disabled  ──> "DISABLED|t|u|r"
//!          ├─ Unauthorized / unknown transponder ──> "NOK|t|r"
//!          └─ lookup unavailable or failed ──> logged only
//! ```
//!
//! # Lifecycle
//!
//! [`ReaderSession::initialize`] returns an open session or a typed error
//! with no port left open. [`ReaderSession::close`] stops both tasks and
//! releases the port; once it returns no further events are emitted.

use crate::authorization::{AuthorizationResolver, Decision, LookupService, UnknownReason};
use crate::config::{EventItems, ReaderConfig};
use crate::debounce::DebounceGate;
use crate::events::{AccessEvent, EventSink};
use crate::relay::{PulseRequest, RelayActuator, RelayTrigger};
use bytes::BytesMut;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use strikeplate_core::{
    ReaderVariant,
    constants::{MAX_FRAME_BUFFER, SWITCH_OFF},
};
use strikeplate_hardware::{
    AnySerialTransport, HardwareError, OpenFailureKind, PortProvider, SerialTransport,
};
use strikeplate_protocol::{Frame, FrameParser, display_bytes};
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Errors returned by a reader session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The serial port could not be found or opened.
    #[error(transparent)]
    Hardware(#[from] HardwareError),

    /// The session configuration is invalid.
    #[error(transparent)]
    Config(#[from] strikeplate_core::Error),

    /// The session has been closed.
    #[error("Reader session on '{0}' is closed")]
    Closed(String),
}

impl SessionError {
    /// Returns `true` if the session could not be opened.
    pub fn is_initialization(&self) -> bool {
        match self {
            Self::Hardware(e) => e.is_initialization(),
            Self::Config(_) => true,
            Self::Closed(_) => false,
        }
    }
}

/// Collaborators of a session.
#[derive(Clone)]
pub struct SessionServices {
    /// Transponder lookup; `None` if no lookup service is available.
    pub lookup: Option<Arc<dyn LookupService>>,

    /// Receiver of decisions and relay state updates.
    pub events: Arc<dyn EventSink>,
}

impl SessionServices {
    /// Services without a lookup.
    pub fn new(events: Arc<dyn EventSink>) -> Self {
        Self {
            lookup: None,
            events,
        }
    }

    /// Set the lookup service.
    pub fn with_lookup(mut self, lookup: Arc<dyn LookupService>) -> Self {
        self.lookup = Some(lookup);
        self
    }
}

impl fmt::Debug for SessionServices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionServices")
            .field("lookup", &self.lookup.is_some())
            .finish_non_exhaustive()
    }
}

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Port open, tasks running.
    Open,

    /// Port released.
    Closed,
}

/// An open connection to one transponder reader.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use strikeplate_access::{
///     ChannelEventSink, EventItems, ReaderConfig, ReaderSession, SessionServices, StaticLookup,
/// };
/// use strikeplate_core::{ReaderId, ReaderVariant};
/// use strikeplate_hardware::MockPorts;
///
/// #[tokio::main(flavor = "current_thread", start_paused = true)]
/// async fn main() -> Result<(), strikeplate_access::SessionError> {
///     let ports = MockPorts::new();
///     let reader = ports.add_port("/dev/ttyUSB0");
///
///     let (sink, mut events) = ChannelEventSink::new();
///     let services = SessionServices::new(Arc::new(sink))
///         .with_lookup(Arc::new(StaticLookup::new().with_entry("AB12EF34CD", "Bob|D1")));
///     let config = ReaderConfig::new("/dev/ttyUSB0", ReaderVariant::Leser9)
///         .with_reader_id(ReaderId::new("D1")?)
///         .with_items(EventItems::new().with_transponder_events("Door_Events"));
///
///     let mut session = ReaderSession::initialize(&ports, config, services).await?;
///
///     reader.feed(b"\x02RAB12EF34CD\x04");
///     let event = events.recv().await.unwrap();
///     assert_eq!(event.payload, "OK|AB12EF34CD|Bob|D1");
///
///     session.close().await;
///     assert!(!reader.is_open());
///     Ok(())
/// }
/// ```
pub struct ReaderSession {
    port: String,
    variant: ReaderVariant,
    items: EventItems,
    events: Arc<dyn EventSink>,
    disabled: Arc<AtomicBool>,
    relay: RelayActuator,
    trigger: RelayTrigger,
    shutdown_tx: watch::Sender<bool>,
    reader: Option<JoinHandle<AnySerialTransport>>,
    state: SessionState,
}

impl fmt::Debug for ReaderSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReaderSession")
            .field("port", &self.port)
            .field("variant", &self.variant)
            .field("items", &self.items)
            .field("disabled", &self.transponders_disabled())
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl ReaderSession {
    /// Open the configured port and start the session.
    ///
    /// The port is looked up among the ports `ports` enumerates, opened
    /// exclusively with the line settings of the variant and duplicated
    /// into a read and a write handle.
    ///
    /// # Errors
    ///
    /// - `SessionError::Config` if the configuration is invalid
    /// - `SessionError::Hardware` with `PortNotFound` (listing the ports that
    ///   do exist) or `PortOpenFailure`
    ///
    /// No port handle stays open when an error is returned.
    pub async fn initialize<P: PortProvider>(
        ports: &P,
        config: ReaderConfig,
        services: SessionServices,
    ) -> Result<Self, SessionError> {
        config.validate()?;
        let parser = config.frame_parser()?;

        let available = ports.available_ports()?;
        if !available.iter().any(|info| info.name == config.port) {
            let names = available.into_iter().map(|info| info.name).collect();
            return Err(HardwareError::port_not_found(&config.port, names).into());
        }

        let mut read_half = ports.open(&config.port, &config.serial_settings())?;
        let write_half = match read_half.try_clone() {
            Ok(handle) => handle,
            Err(e) => {
                let _ = read_half.close().await;
                return Err(match e {
                    e @ HardwareError::PortOpenFailure { .. } => e,
                    other => HardwareError::port_open(
                        &config.port,
                        OpenFailureKind::StreamUnavailable,
                        other.to_string(),
                    ),
                }
                .into());
            }
        };

        let relay = RelayActuator::spawn(write_half, config.pulse_spec(), &config.port);
        let trigger = relay.trigger();
        let disabled = Arc::new(AtomicBool::new(false));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let pipeline = AccessPipeline {
            port: config.port.clone(),
            parser,
            debounce: DebounceGate::new(config.debounce_window()),
            resolver: AuthorizationResolver::new(services.lookup),
            events: Arc::clone(&services.events),
            event_item: config.items.transponder_events.clone(),
            disabled: Arc::clone(&disabled),
            trigger: trigger.clone(),
        };
        let reader = tokio::spawn(read_loop(
            read_half,
            config.quiescence(),
            pipeline,
            shutdown_rx,
        ));

        info!(
            "Reader session on '{}' opened ({}, {} baud)",
            config.port,
            config.variant,
            config.variant.baud_rate()
        );

        Ok(Self {
            port: config.port,
            variant: config.variant,
            items: config.items,
            events: services.events,
            disabled,
            relay,
            trigger,
            shutdown_tx,
            reader: Some(reader),
            state: SessionState::Open,
        })
    }

    /// Port name of the session.
    pub fn port(&self) -> &str {
        &self.port
    }

    /// Reader variant of the session.
    pub fn variant(&self) -> ReaderVariant {
        self.variant
    }

    /// Items the session reports to.
    pub fn items(&self) -> &EventItems {
        &self.items
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Returns `true` until [`close`](Self::close) has been called.
    pub fn is_open(&self) -> bool {
        self.state == SessionState::Open
    }

    fn ensure_open(&self) -> Result<(), SessionError> {
        match self.state {
            SessionState::Open => Ok(()),
            SessionState::Closed => Err(SessionError::Closed(self.port.clone())),
        }
    }

    /// Open the door regardless of the disabled flag.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Closed` after [`close`](Self::close).
    pub fn open_door(&self) -> Result<PulseRequest, SessionError> {
        self.ensure_open()?;
        let request = self.trigger.open_door();
        match request {
            PulseRequest::Started => debug!("Door opening requested on '{}'", self.port),
            PulseRequest::Busy => debug!("Relay on '{}' busy, request dropped", self.port),
            PulseRequest::Stopped => warn!("Relay on '{}' stopped, request dropped", self.port),
        }
        Ok(request)
    }

    /// Stop (or resume) opening the door for authorized transponders.
    ///
    /// While disabled, authorized reads are reported as `DISABLED` and the
    /// relay stays closed. Manual openings are not affected.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Closed` after [`close`](Self::close).
    pub fn disable_transponders(&self, disabled: bool) -> Result<(), SessionError> {
        self.ensure_open()?;
        self.disabled.store(disabled, Ordering::Release);
        debug!(
            "Transponders on '{}' {}",
            self.port,
            if disabled { "disabled" } else { "enabled" }
        );
        Ok(())
    }

    /// Returns `true` while transponder openings are disabled.
    pub fn transponders_disabled(&self) -> bool {
        self.disabled.load(Ordering::Acquire)
    }

    /// Route a switch command addressed to one of the session's items.
    ///
    /// `ON` to the open-door item opens the door and resets the switch with
    /// an `OFF` update; a command to the disable-transponders item sets the
    /// disabled flag. Commands to other items are ignored.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Closed` after [`close`](Self::close).
    pub fn handle_command(&self, item: &str, on: bool) -> Result<(), SessionError> {
        self.ensure_open()?;

        if self.items.open_door.as_deref() == Some(item) {
            if on {
                self.open_door()?;
                self.events.post_update(item, SWITCH_OFF);
            }
        } else if self.items.disable_transponders.as_deref() == Some(item) {
            self.disable_transponders(on)?;
        } else {
            debug!("Ignoring command for '{}' on '{}'", item, self.port);
        }
        Ok(())
    }

    /// Stop the session and release the port.
    ///
    /// Waits for the read task to finish and for a running relay pulse to
    /// complete. Calling this again is a no-op.
    pub async fn close(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }
        self.state = SessionState::Closed;
        let _ = self.shutdown_tx.send(true);

        let read_half = match self.reader.take() {
            Some(reader) => match reader.await {
                Ok(transport) => Some(transport),
                Err(e) => {
                    warn!("Read task of '{}' failed: {}", self.port, e);
                    None
                }
            },
            None => None,
        };

        self.relay.shutdown().await;

        if let Some(mut transport) = read_half
            && let Err(e) = transport.close().await
        {
            warn!("Closing read handle of '{}' failed: {}", self.port, e);
        }

        info!("Reader session on '{}' closed", self.port);
    }
}

impl Drop for ReaderSession {
    fn drop(&mut self) {
        if self.state == SessionState::Open {
            let _ = self.shutdown_tx.send(true);
            if let Some(reader) = self.reader.take() {
                reader.abort();
            }
            debug!("Reader session on '{}' dropped while open", self.port);
        }
    }
}

/// Bytes collected during one read burst.
#[derive(Debug, Default)]
struct ReadBuffer {
    bytes: BytesMut,
    overflowed: bool,
}

impl ReadBuffer {
    fn push(&mut self, chunk: &[u8]) {
        if self.overflowed {
            return;
        }
        if self.bytes.len() + chunk.len() > MAX_FRAME_BUFFER {
            self.overflowed = true;
            self.bytes.clear();
        } else {
            self.bytes.extend_from_slice(chunk);
        }
    }
}

/// Read everything currently pending on the port.
async fn drain(transport: &mut AnySerialTransport, buffer: &mut ReadBuffer) -> Result<(), HardwareError> {
    while transport.bytes_available()? > 0 {
        let chunk = transport.read_available().await?;
        if chunk.is_empty() {
            break;
        }
        buffer.push(&chunk);
    }
    Ok(())
}

/// Collect one burst: drain, wait for the line to go idle, drain again.
async fn read_burst(
    transport: &mut AnySerialTransport,
    quiescence: Duration,
) -> Result<ReadBuffer, HardwareError> {
    let mut buffer = ReadBuffer::default();
    drain(transport, &mut buffer).await?;

    tokio::time::sleep(quiescence).await;
    if transport.bytes_available()? > 0 {
        drain(transport, &mut buffer).await?;
    }

    Ok(buffer)
}

async fn read_loop(
    mut transport: AnySerialTransport,
    quiescence: Duration,
    mut pipeline: AccessPipeline,
    mut shutdown_rx: watch::Receiver<bool>,
) -> AnySerialTransport {
    loop {
        tokio::select! {
            biased;
            _ = shutdown_rx.changed() => break,
            ready = transport.wait_readable() => {
                let burst = match ready {
                    Ok(()) => read_burst(&mut transport, quiescence).await,
                    Err(e) => Err(e),
                };

                match burst {
                    Ok(buffer) if buffer.overflowed => {
                        warn!(
                            "Discarding read burst on '{}' longer than {} bytes",
                            pipeline.port, MAX_FRAME_BUFFER
                        );
                    }
                    Ok(buffer) => pipeline.process(&buffer.bytes),
                    Err(e @ (HardwareError::Disconnected { .. } | HardwareError::Closed { .. })) => {
                        error!("Reading from '{}' stopped: {}", pipeline.port, e);
                        break;
                    }
                    Err(e) => {
                        error!("Read error on '{}': {}", pipeline.port, e);
                        tokio::time::sleep(quiescence).await;
                    }
                }
            }
        }
    }

    debug!("Read task for '{}' stopped", pipeline.port);
    transport
}

/// Per-session state of the read task.
struct AccessPipeline {
    port: String,
    parser: FrameParser,
    debounce: DebounceGate,
    resolver: AuthorizationResolver,
    events: Arc<dyn EventSink>,
    event_item: Option<String>,
    disabled: Arc<AtomicBool>,
    trigger: RelayTrigger,
}

impl AccessPipeline {
    fn process(&mut self, buffer: &[u8]) {
        debug!("Received {} on '{}'", display_bytes(buffer), self.port);

        let Some(item) = self.event_item.as_deref() else {
            return;
        };

        for segment in self.parser.segments(buffer) {
            let Some(frame) = self.parser.try_parse(segment) else {
                debug!(
                    "Discarding non-matching buffer {} on '{}'",
                    display_bytes(segment),
                    self.port
                );
                continue;
            };

            if !self.debounce.accept(Instant::now()) {
                debug!("Ignoring {} on '{}' within debounce window", frame, self.port);
                continue;
            }

            if let Some(event) = self.decide(frame) {
                self.events.send_command(item, &event.payload());
            }
        }
    }

    fn decide(&self, frame: Frame) -> Option<AccessEvent> {
        let Frame {
            reader_id: reader,
            transponder_id: transponder,
        } = frame;

        match self.resolver.resolve(&transponder, &reader) {
            Decision::Authorized(user) => {
                if self.disabled.load(Ordering::Acquire) {
                    debug!(
                        "{} authorized on '{}' but transponders are disabled",
                        transponder, self.port
                    );
                    return Some(AccessEvent::Disabled {
                        transponder,
                        user,
                        reader,
                    });
                }

                match self.trigger.open_door() {
                    PulseRequest::Started => {
                        debug!("{} authorized on '{}' for {}", transponder, self.port, user);
                    }
                    PulseRequest::Busy => {
                        debug!("Relay on '{}' busy, door already opening", self.port);
                    }
                    PulseRequest::Stopped => {
                        warn!("Relay on '{}' stopped, door not opened", self.port);
                    }
                }
                Some(AccessEvent::Granted {
                    transponder,
                    user,
                    reader,
                })
            }
            Decision::Unauthorized => {
                debug!("{} not authorized for reader {} on '{}'", transponder, reader, self.port);
                Some(AccessEvent::Denied {
                    transponder,
                    reader,
                })
            }
            Decision::Unknown(reason) if reason.is_denial() => {
                debug!("{} denied on '{}': {}", transponder, self.port, reason);
                Some(AccessEvent::Denied {
                    transponder,
                    reader,
                })
            }
            Decision::Unknown(UnknownReason::LookupUnavailable) => {
                error!(
                    "No lookup service configured for '{}', {} ignored",
                    self.port, transponder
                );
                None
            }
            Decision::Unknown(reason) => {
                error!(
                    "Authorization of {} on '{}' failed: {}",
                    transponder, self.port, reason
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_buffer_accumulates() {
        let mut buffer = ReadBuffer::default();
        buffer.push(b"\x02R");
        buffer.push(b"AB12EF34CD\x04");

        assert!(!buffer.overflowed);
        assert_eq!(&buffer.bytes[..], b"\x02RAB12EF34CD\x04");
    }

    #[test]
    fn test_read_buffer_overflow_discards() {
        let mut buffer = ReadBuffer::default();
        buffer.push(&[b'x'; MAX_FRAME_BUFFER]);
        assert!(!buffer.overflowed);

        buffer.push(b"y");
        assert!(buffer.overflowed);
        assert!(buffer.bytes.is_empty());

        buffer.push(b"\x02RAB12EF34CD\x04");
        assert!(buffer.bytes.is_empty());
    }

    #[test]
    fn test_session_error_display() {
        let error = SessionError::from(HardwareError::port_not_found(
            "/dev/ttyS9",
            vec!["/dev/ttyUSB0".to_string()],
        ));
        assert!(error.to_string().contains("/dev/ttyUSB0"));
        assert!(error.is_initialization());

        let error = SessionError::Closed("/dev/ttyUSB0".to_string());
        assert_eq!(error.to_string(), "Reader session on '/dev/ttyUSB0' is closed");
        assert!(!error.is_initialization());

        let error = SessionError::from(strikeplate_core::Error::Config("empty".to_string()));
        assert!(error.is_initialization());
    }
}
