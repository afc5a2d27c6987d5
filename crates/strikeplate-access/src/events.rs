//! Upstream notifications.
//!
//! The session reports every decision as a command on the
//! transponder-event item and the relay state as an update on the
//! open-door item. Where these end up is up to the [`EventSink`].

use chrono::{DateTime, Utc};
use std::fmt;
use strikeplate_core::{
    ReaderId, TransponderId,
    constants::{EVENT_DENIED, EVENT_DISABLED, EVENT_FIELD_SEPARATOR, EVENT_GRANTED},
};
use tokio::sync::mpsc;
use tracing::{info, warn};

/// A decision reported upstream.
///
/// # Wire Format
///
/// ```text
/// OK|AB12EF34CD|Bob|D1          granted
/// DISABLED|AB12EF34CD|Bob|D1    granted while transponders are disabled
/// NOK|AB12EF34CD|D1             denied
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessEvent {
    /// Access granted and the door opened.
    Granted {
        transponder: TransponderId,
        user: String,
        reader: ReaderId,
    },

    /// Access would be granted but transponders are disabled.
    Disabled {
        transponder: TransponderId,
        user: String,
        reader: ReaderId,
    },

    /// Access denied.
    Denied {
        transponder: TransponderId,
        reader: ReaderId,
    },
}

impl AccessEvent {
    /// Leading keyword of the payload.
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Granted { .. } => EVENT_GRANTED,
            Self::Disabled { .. } => EVENT_DISABLED,
            Self::Denied { .. } => EVENT_DENIED,
        }
    }

    /// The payload sent to the sink.
    pub fn payload(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for AccessEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sep = EVENT_FIELD_SEPARATOR;
        match self {
            Self::Granted {
                transponder,
                user,
                reader,
            }
            | Self::Disabled {
                transponder,
                user,
                reader,
            } => write!(
                f,
                "{}{sep}{transponder}{sep}{user}{sep}{reader}",
                self.keyword()
            ),
            Self::Denied {
                transponder,
                reader,
            } => write!(f, "{}{sep}{transponder}{sep}{reader}", self.keyword()),
        }
    }
}

/// Receiver of upstream notifications.
pub trait EventSink: Send + Sync {
    /// Send a command to `item`.
    fn send_command(&self, item: &str, payload: &str);

    /// Post a state update for `item`.
    fn post_update(&self, item: &str, payload: &str);
}

/// Sink that writes notifications to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn send_command(&self, item: &str, payload: &str) {
        info!("Command '{}' sent to '{}'", payload, item);
    }

    fn post_update(&self, item: &str, payload: &str) {
        info!("Update '{}' posted to '{}'", payload, item);
    }
}

/// Kind of a [`SinkMessage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkMessageKind {
    /// From [`EventSink::send_command`].
    Command,

    /// From [`EventSink::post_update`].
    Update,
}

/// A notification captured by [`ChannelEventSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkMessage {
    /// Command or update.
    pub kind: SinkMessageKind,

    /// Target item.
    pub item: String,

    /// Payload.
    pub payload: String,

    /// When the notification was emitted.
    pub at: DateTime<Utc>,
}

/// Sink that forwards notifications into a channel.
///
/// # Examples
///
/// ```
/// use strikeplate_access::{ChannelEventSink, EventSink, SinkMessageKind};
///
/// let (sink, mut rx) = ChannelEventSink::new();
/// sink.send_command("Door_Events", "NOK|AB12EF34CD|D1");
///
/// let message = rx.try_recv().unwrap();
/// assert_eq!(message.kind, SinkMessageKind::Command);
/// assert_eq!(message.payload, "NOK|AB12EF34CD|D1");
/// ```
#[derive(Debug, Clone)]
pub struct ChannelEventSink {
    tx: mpsc::UnboundedSender<SinkMessage>,
}

impl ChannelEventSink {
    /// Create a sink and the receiver for its messages.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SinkMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn forward(&self, kind: SinkMessageKind, item: &str, payload: &str) {
        let message = SinkMessage {
            kind,
            item: item.to_string(),
            payload: payload.to_string(),
            at: Utc::now(),
        };
        if self.tx.send(message).is_err() {
            warn!("Event receiver dropped, '{}' to '{}' lost", payload, item);
        }
    }
}

impl EventSink for ChannelEventSink {
    fn send_command(&self, item: &str, payload: &str) {
        self.forward(SinkMessageKind::Command, item, payload);
    }

    fn post_update(&self, item: &str, payload: &str) {
        self.forward(SinkMessageKind::Update, item, payload);
    }
}
