//! Access control engine for serial transponder readers.
//!
//! This crate turns the byte stream of a Leser 7plus or Leser 9 reader into
//! access decisions and door openings:
//!
//! - [`ReaderSession`] owns the serial port and runs the read task
//! - [`DebounceGate`] suppresses repeated reads of a held transponder
//! - [`AuthorizationResolver`] asks a [`LookupService`] whether a
//!   transponder opens a reader
//! - [`RelayActuator`] pulses the door strike relay
//! - [`EventSink`] receives the `OK`/`DISABLED`/`NOK` decisions
//!
//! Frames are parsed by [`strikeplate_protocol`]; serial ports come from
//! [`strikeplate_hardware`].

pub mod authorization;
pub mod config;
pub mod debounce;
pub mod events;
pub mod relay;
pub mod session;

pub use authorization::{
    AuthorizationRecord, AuthorizationResolver, Decision, LookupError, LookupService,
    MapFileLookup, StaticLookup, UnknownReason,
};
pub use config::{EventItems, ReaderConfig};
pub use debounce::DebounceGate;
pub use events::{
    AccessEvent, ChannelEventSink, EventSink, SinkMessage, SinkMessageKind, TracingEventSink,
};
pub use relay::{PulseRequest, RelayActuator, RelayTrigger};
pub use session::{ReaderSession, SessionError, SessionServices, SessionState};
