//! Reader session configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use strikeplate_core::{
    Error, ReaderId, ReaderVariant, Result,
    constants::{
        DEFAULT_DEBOUNCE_WINDOW_MS, DEFAULT_QUIESCENCE_MS, DEFAULT_RELAY_HOLD_MS,
        PORT_OPEN_TIMEOUT_MS,
    },
};
use strikeplate_hardware::SerialSettings;
use strikeplate_protocol::{FrameParser, RelayPulseSpec};

/// Upstream items a session reports to and takes commands from.
///
/// An absent item disables the corresponding feature: without a
/// transponder-event item, received frames are not processed at all.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventItems {
    /// Receives `OK`/`DISABLED`/`NOK` commands.
    pub transponder_events: Option<String>,

    /// Switch that opens the door; receives the relay state.
    pub open_door: Option<String>,

    /// Switch that disables transponder-triggered door openings.
    pub disable_transponders: Option<String>,
}

impl EventItems {
    /// No items attached.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the transponder-event item.
    pub fn with_transponder_events(mut self, item: impl Into<String>) -> Self {
        self.transponder_events = Some(item.into());
        self
    }

    /// Set the open-door item.
    pub fn with_open_door(mut self, item: impl Into<String>) -> Self {
        self.open_door = Some(item.into());
        self
    }

    /// Set the disable-transponders item.
    pub fn with_disable_transponders(mut self, item: impl Into<String>) -> Self {
        self.disable_transponders = Some(item.into());
        self
    }
}

/// Configuration of one reader session.
///
/// # Examples
///
/// ```
/// use strikeplate_access::{EventItems, ReaderConfig};
/// use strikeplate_core::{ReaderId, ReaderVariant};
///
/// let config = ReaderConfig::new("/dev/ttyUSB0", ReaderVariant::Leser9)
///     .with_reader_id(ReaderId::new("D1").unwrap())
///     .with_items(EventItems::new().with_transponder_events("Door_Events"));
/// assert!(config.validate().is_ok());
/// assert_eq!(config.serial_settings().baud_rate, 9600);
///
/// let json = r#"{ "port": "/dev/ttyUSB1", "variant": "leser7plus" }"#;
/// let config: ReaderConfig = serde_json::from_str(json).unwrap();
/// assert_eq!(config.debounce_window_ms, 15_000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReaderConfig {
    /// Serial port name (e.g., "/dev/ttyUSB0" or "COM3").
    pub port: String,

    /// Reader family attached to the port.
    pub variant: ReaderVariant,

    /// Reader ID reported for every frame. Required for Leser 9.
    #[serde(default)]
    pub reader_id: Option<ReaderId>,

    /// Upstream items.
    #[serde(default)]
    pub items: EventItems,

    /// Minimum time between two processed reads.
    #[serde(default = "default_debounce_window_ms")]
    pub debounce_window_ms: u64,

    /// Idle time that ends a read burst.
    #[serde(default = "default_quiescence_ms")]
    pub quiescence_ms: u64,

    /// Relay hold time between pulse commands.
    #[serde(default = "default_relay_hold_ms")]
    pub relay_hold_ms: u64,
}

fn default_debounce_window_ms() -> u64 {
    DEFAULT_DEBOUNCE_WINDOW_MS
}

fn default_quiescence_ms() -> u64 {
    DEFAULT_QUIESCENCE_MS
}

fn default_relay_hold_ms() -> u64 {
    DEFAULT_RELAY_HOLD_MS
}

impl ReaderConfig {
    /// Configuration with default timing and no items.
    pub fn new(port: impl Into<String>, variant: ReaderVariant) -> Self {
        Self {
            port: port.into(),
            variant,
            reader_id: None,
            items: EventItems::default(),
            debounce_window_ms: DEFAULT_DEBOUNCE_WINDOW_MS,
            quiescence_ms: DEFAULT_QUIESCENCE_MS,
            relay_hold_ms: DEFAULT_RELAY_HOLD_MS,
        }
    }

    /// Set the session reader ID.
    pub fn with_reader_id(mut self, reader_id: ReaderId) -> Self {
        self.reader_id = Some(reader_id);
        self
    }

    /// Set the upstream items.
    pub fn with_items(mut self, items: EventItems) -> Self {
        self.items = items;
        self
    }

    /// Set the debounce window.
    pub fn with_debounce_window(mut self, window: Duration) -> Self {
        self.debounce_window_ms = duration_ms(window);
        self
    }

    /// Set the quiescence interval.
    pub fn with_quiescence(mut self, quiescence: Duration) -> Self {
        self.quiescence_ms = duration_ms(quiescence);
        self
    }

    /// Set the relay hold time.
    pub fn with_relay_hold(mut self, hold: Duration) -> Self {
        self.relay_hold_ms = duration_ms(hold);
        self
    }

    /// Check the configuration before a session is opened.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` for an empty port name and
    /// `Error::MissingReaderId` for a Leser 9 session without reader ID.
    pub fn validate(&self) -> Result<()> {
        if self.port.trim().is_empty() {
            return Err(Error::Config("serial port name is empty".to_string()));
        }

        self.frame_parser().map(|_| ())
    }

    /// Minimum time between two processed reads.
    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.debounce_window_ms)
    }

    /// Idle time that ends a read burst.
    pub fn quiescence(&self) -> Duration {
        Duration::from_millis(self.quiescence_ms)
    }

    /// Relay hold time.
    pub fn relay_hold(&self) -> Duration {
        Duration::from_millis(self.relay_hold_ms)
    }

    /// Line settings for the variant: its baud rate, 8N1.
    pub fn serial_settings(&self) -> SerialSettings {
        SerialSettings::new(self.variant.baud_rate())
            .with_open_timeout(Duration::from_millis(PORT_OPEN_TIMEOUT_MS))
    }

    /// Frame parser for the variant and reader ID.
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingReaderId` for a Leser 9 session without reader ID.
    pub fn frame_parser(&self) -> Result<FrameParser> {
        FrameParser::new(self.variant, self.reader_id.clone())
    }

    /// Relay pulse for the variant with the configured hold time.
    pub fn pulse_spec(&self) -> RelayPulseSpec {
        RelayPulseSpec::for_variant(self.variant).with_hold(self.relay_hold())
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use strikeplate_hardware::Parity;

    #[test]
    fn test_config_defaults() {
        let config = ReaderConfig::new("/dev/ttyUSB0", ReaderVariant::Leser7Plus);
        assert_eq!(config.debounce_window(), Duration::from_millis(15_000));
        assert_eq!(config.quiescence(), Duration::from_millis(50));
        assert_eq!(config.relay_hold(), Duration::from_millis(1000));
        assert_eq!(config.items, EventItems::default());
        assert!(config.validate().is_ok());
    }

    #[rstest]
    #[case(ReaderVariant::Leser7Plus, 57_600)]
    #[case(ReaderVariant::Leser9, 9_600)]
    fn test_serial_settings(#[case] variant: ReaderVariant, #[case] baud: u32) {
        let settings = ReaderConfig::new("/dev/ttyUSB0", variant).serial_settings();
        assert_eq!(settings.baud_rate, baud);
        assert_eq!(settings.data_bits, 8);
        assert_eq!(settings.stop_bits, 1);
        assert_eq!(settings.parity, Parity::None);
        assert_eq!(settings.open_timeout, Duration::from_millis(2000));
    }

    #[test]
    fn test_leser9_requires_reader_id() {
        let config = ReaderConfig::new("/dev/ttyUSB0", ReaderVariant::Leser9);
        assert!(matches!(
            config.validate(),
            Err(Error::MissingReaderId { .. })
        ));

        let config = config.with_reader_id(ReaderId::new("D1").unwrap());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_port_rejected() {
        let config = ReaderConfig::new("  ", ReaderVariant::Leser7Plus);
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_builders() {
        let config = ReaderConfig::new("/dev/ttyUSB0", ReaderVariant::Leser7Plus)
            .with_debounce_window(Duration::from_secs(5))
            .with_quiescence(Duration::from_millis(20))
            .with_relay_hold(Duration::from_millis(500));

        assert_eq!(config.debounce_window_ms, 5000);
        assert_eq!(config.quiescence_ms, 20);
        assert_eq!(config.pulse_spec().hold, Duration::from_millis(500));
        assert!(config.pulse_spec().repeat_close);
    }

    #[test]
    fn test_deserialize_full() {
        let json = r#"{
            "port": "COM3",
            "variant": "leser9",
            "reader_id": "D1",
            "items": {
                "transponder_events": "Door_Events",
                "open_door": "Door_Open"
            },
            "debounce_window_ms": 3000
        }"#;

        let config: ReaderConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.variant, ReaderVariant::Leser9);
        assert_eq!(config.reader_id.as_ref().map(ReaderId::as_str), Some("D1"));
        assert_eq!(config.items.open_door.as_deref(), Some("Door_Open"));
        assert!(config.items.disable_transponders.is_none());
        assert_eq!(config.debounce_window_ms, 3000);
        assert_eq!(config.relay_hold_ms, 1000);
    }

    #[test]
    fn test_deserialize_invalid_reader_id() {
        let json = r#"{ "port": "COM3", "variant": "leser9", "reader_id": "D|1" }"#;
        assert!(serde_json::from_str::<ReaderConfig>(json).is_err());
    }
}
