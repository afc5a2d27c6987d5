//! Common test utilities for reader session integration tests.
//!
//! Sessions run against [`MockPorts`] with a paused Tokio clock, so relay
//! holds and debounce windows elapse instantly while their timestamps stay
//! exact.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;
use strikeplate_access::{
    ChannelEventSink, EventItems, LookupError, LookupService, ReaderConfig, ReaderSession,
    SessionServices, SinkMessage, StaticLookup,
};
use strikeplate_core::{
    ReaderId, ReaderVariant,
    constants::{END_BYTE, LESER7PLUS_TRANSPONDER_MARKER, LESER9_TRANSPONDER_PREFIX, START_BYTE},
};
use strikeplate_hardware::{MockPorts, MockSerialPortHandle};
use tokio::sync::mpsc::UnboundedReceiver;

pub const PORT: &str = "/dev/ttyUSB0";
pub const EVENTS_ITEM: &str = "Door_Events";
pub const OPEN_ITEM: &str = "Door_Open";
pub const DISABLE_ITEM: &str = "Door_Disable";
pub const CARD: &str = "AB12EF34CD";

/// A running session with its mock port and event receiver.
pub struct Harness {
    pub session: ReaderSession,
    pub reader: MockSerialPortHandle,
    pub events: UnboundedReceiver<SinkMessage>,
    pub ports: MockPorts,
}

impl Harness {
    /// Payloads of all events emitted so far.
    pub fn payloads(&mut self) -> Vec<String> {
        let mut payloads = Vec::new();
        while let Ok(message) = self.events.try_recv() {
            payloads.push(message.payload);
        }
        payloads
    }

    /// All messages emitted so far.
    pub fn messages(&mut self) -> Vec<SinkMessage> {
        let mut messages = Vec::new();
        while let Ok(message) = self.events.try_recv() {
            messages.push(message);
        }
        messages
    }

    /// Number of relay commands written so far.
    pub fn write_count(&self) -> usize {
        self.reader.writes().len()
    }
}

/// Lookup service that always fails.
pub struct FailingLookup;

impl LookupService for FailingLookup {
    fn transform(&self, map_name: &str, key: &str) -> Result<String, LookupError> {
        Err(LookupError::transform(map_name, key, "map not loaded"))
    }
}

/// Initialize log output once; honours `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn all_items() -> EventItems {
    EventItems::new()
        .with_transponder_events(EVENTS_ITEM)
        .with_open_door(OPEN_ITEM)
        .with_disable_transponders(DISABLE_ITEM)
}

pub fn leser9_config(reader_id: &str) -> ReaderConfig {
    ReaderConfig::new(PORT, ReaderVariant::Leser9)
        .with_reader_id(ReaderId::new(reader_id).unwrap())
        .with_items(all_items())
}

pub fn leser7plus_config() -> ReaderConfig {
    ReaderConfig::new(PORT, ReaderVariant::Leser7Plus).with_items(all_items())
}

pub fn lookup(entries: &[(&str, &str)]) -> Option<Arc<dyn LookupService>> {
    let lookup = entries
        .iter()
        .fold(StaticLookup::new(), |lookup, (key, value)| {
            lookup.with_entry(*key, *value)
        });
    Some(Arc::new(lookup))
}

/// Start a session on a fresh mock port.
pub async fn start(config: ReaderConfig, lookup: Option<Arc<dyn LookupService>>) -> Harness {
    init_tracing();

    let ports = MockPorts::new();
    let reader = ports.add_port(PORT);
    let (sink, events) = ChannelEventSink::new();

    let mut services = SessionServices::new(Arc::new(sink));
    if let Some(lookup) = lookup {
        services = services.with_lookup(lookup);
    }

    let session = ReaderSession::initialize(&ports, config, services)
        .await
        .expect("session should open");

    Harness {
        session,
        reader,
        events,
        ports,
    }
}

pub fn leser9_frame(card: &str) -> Vec<u8> {
    let mut frame = vec![START_BYTE, LESER9_TRANSPONDER_PREFIX];
    frame.extend_from_slice(card.as_bytes());
    frame.push(END_BYTE);
    frame
}

pub fn leser7plus_frame(reader: &str, card: &str) -> Vec<u8> {
    let mut frame = vec![START_BYTE];
    frame.extend_from_slice(reader.as_bytes());
    frame.extend_from_slice(LESER7PLUS_TRANSPONDER_MARKER.as_bytes());
    frame.extend_from_slice(card.as_bytes());
    frame.extend_from_slice(b"0000");
    frame.push(END_BYTE);
    frame
}

/// Let the session tasks run for `ms` of (paused) time.
pub async fn advance(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}
