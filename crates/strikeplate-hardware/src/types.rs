//! Common types shared across serial transport implementations.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default timeout for opening a port.
const DEFAULT_OPEN_TIMEOUT: Duration = Duration::from_millis(2000);

/// Parity checking mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Parity {
    /// No parity bit.
    None,

    /// Odd parity.
    Odd,

    /// Even parity.
    Even,
}

/// Serial line settings applied when a port is opened.
///
/// # Examples
///
/// ```
/// use strikeplate_hardware::types::{Parity, SerialSettings};
///
/// let settings = SerialSettings::new(9600);
/// assert_eq!(settings.data_bits, 8);
/// assert_eq!(settings.stop_bits, 1);
/// assert_eq!(settings.parity, Parity::None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerialSettings {
    /// Line speed in bits per second.
    pub baud_rate: u32,

    /// Data bits per character.
    pub data_bits: u8,

    /// Stop bits per character.
    pub stop_bits: u8,

    /// Parity mode.
    pub parity: Parity,

    /// How long to wait for the port to open.
    pub open_timeout: Duration,
}

impl SerialSettings {
    /// 8N1 settings at the given baud rate.
    pub fn new(baud_rate: u32) -> Self {
        Self {
            baud_rate,
            data_bits: 8,
            stop_bits: 1,
            parity: Parity::None,
            open_timeout: DEFAULT_OPEN_TIMEOUT,
        }
    }

    /// Set the open timeout.
    pub fn with_open_timeout(mut self, open_timeout: Duration) -> Self {
        self.open_timeout = open_timeout;
        self
    }
}

/// An enumerated serial port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortInfo {
    /// Port name (e.g., "/dev/ttyUSB0" or "COM3").
    pub name: String,

    /// Product description, if the OS reports one.
    pub product: Option<String>,
}

impl PortInfo {
    /// Create a new PortInfo without a product description.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            product: None,
        }
    }

    /// Set the product description.
    pub fn with_product(mut self, product: impl Into<String>) -> Self {
        self.product = Some(product.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_defaults() {
        let settings = SerialSettings::new(57_600);
        assert_eq!(settings.baud_rate, 57_600);
        assert_eq!(settings.open_timeout, Duration::from_millis(2000));
    }

    #[test]
    fn test_settings_open_timeout() {
        let settings = SerialSettings::new(9600).with_open_timeout(Duration::from_millis(500));
        assert_eq!(settings.open_timeout, Duration::from_millis(500));
    }

    #[test]
    fn test_port_info_builder() {
        let info = PortInfo::new("/dev/ttyUSB0").with_product("FT232R USB UART");
        assert_eq!(info.name, "/dev/ttyUSB0");
        assert_eq!(info.product.as_deref(), Some("FT232R USB UART"));
    }

    #[test]
    fn test_settings_serialization() {
        let settings = SerialSettings::new(9600);
        let json = serde_json::to_string(&settings).unwrap();
        let deserialized: SerialSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(settings, deserialized);
    }
}
