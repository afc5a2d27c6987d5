//! Core constants for the Leser transponder reader protocols.
//!
//! This module defines the wire-level constants shared by the frame parser,
//! the relay actuator and the reader session. Both supported reader families
//! speak a small ASCII protocol over an 8N1 serial line:
//!
//! ```text
//! Leser 7plus:  <STX>RR EM TTTTTTTTTT ... <EOT>
//! Leser 9:      <STX>R TTTTTTTTTT <EOT> ...
//! ```
//!
//! Where:
//! - `<STX>` - Start of text marker (0x02)
//! - `RR` - Two character reader identifier (Leser 7plus only)
//! - `TTTTTTTTTT` - Ten character transponder identifier
//! - `<EOT>` - End marker (0x04)
//!
//! # Usage
//!
//! ```
//! use strikeplate_core::constants::*;
//! use std::time::Duration;
//!
//! assert_eq!(START_BYTE, 0x02);
//! let window = Duration::from_millis(DEFAULT_DEBOUNCE_WINDOW_MS);
//! assert_eq!(window.as_secs(), 15);
//! ```
//!
//! # Protocol Compliance
//!
//! The relay command strings and baud rates come from the reader firmware.
//! Changing them breaks compatibility with installed door controllers.

// ============================================================================
// Framing Markers
// ============================================================================

/// Start of text marker (STX).
///
/// ```text
/// <STX>R0123456789<EOT>
/// ^^^^^
/// ```
pub const START_BYTE: u8 = 0x02; // STX

/// End marker.
///
/// The readers terminate frames with 0x04 (EOT in the C0 table), not with
/// the usual ETX 0x03.
///
/// ```text
/// <STX>R0123456789<EOT>
///                 ^^^^^
/// ```
pub const END_BYTE: u8 = 0x04;

// ============================================================================
// Identifier Constraints
// ============================================================================

/// Length of a transponder identifier on the wire.
pub const TRANSPONDER_ID_LENGTH: usize = 10;

/// Maximum length accepted for a configured reader identifier.
pub const MAX_READER_ID_LENGTH: usize = 32;

/// Marker between reader and transponder identifier in Leser 7plus frames.
pub const LESER7PLUS_TRANSPONDER_MARKER: &str = "EM";

/// Prefix of a transponder frame sent by a Leser 9.
pub const LESER9_TRANSPONDER_PREFIX: u8 = b'R';

/// Upper bound for one accumulated read buffer.
///
/// A valid frame is well below 64 bytes. Anything above this limit is line
/// noise and gets dropped without matching.
pub const MAX_FRAME_BUFFER: usize = 1024;

// ============================================================================
// Serial Line Settings
// ============================================================================

/// Baud rate of the Leser 7plus serial interface.
pub const LESER7PLUS_BAUD_RATE: u32 = 57_600;

/// Baud rate of the Leser 9 serial interface.
pub const LESER9_BAUD_RATE: u32 = 9_600;

/// Timeout for opening a serial port (milliseconds).
pub const PORT_OPEN_TIMEOUT_MS: u64 = 2000;

// ============================================================================
// Relay Commands
// ============================================================================

/// Leser 7plus relay open command: `<STX>FFCR152<EOT>`.
pub const LESER7PLUS_RELAY_OPEN: &[u8] = b"\x02FFCR152\x04";

/// Leser 7plus relay close command: `<STX>FFCR051<EOT>`.
pub const LESER7PLUS_RELAY_CLOSE: &[u8] = b"\x02FFCR051\x04";

/// Leser 9 relay open command: `<STX>R1<EOT>`.
pub const LESER9_RELAY_OPEN: &[u8] = b"\x02R1\x04";

/// Leser 9 relay close command: `<STX>R0<EOT>`.
pub const LESER9_RELAY_CLOSE: &[u8] = b"\x02R0\x04";

// ============================================================================
// Timing
// ============================================================================

/// Minimum time between two processed transponder reads (milliseconds).
///
/// A read arriving exactly at the window boundary is still rejected.
pub const DEFAULT_DEBOUNCE_WINDOW_MS: u64 = 15_000;

/// How long the relay stays energized before the close command (milliseconds).
pub const DEFAULT_RELAY_HOLD_MS: u64 = 1000;

/// Idle time waited once after draining a port before the final
/// availability check (milliseconds).
///
/// Merges a transmission that arrives in several chunks into one buffer.
pub const DEFAULT_QUIESCENCE_MS: u64 = 50;

// ============================================================================
// Lookup Service
// ============================================================================

/// Name of the map the authorization lookup is performed against.
pub const TRANSPONDER_MAP: &str = "transponders.map";

/// Separator between user name and reader list in a lookup record.
pub const RECORD_FIELD_SEPARATOR: char = '|';

/// Separator between reader identifiers in a lookup record.
pub const READER_LIST_SEPARATOR: char = ',';

// ============================================================================
// Event Payloads
// ============================================================================

/// Payload prefix for an authorized read that opened the door.
pub const EVENT_GRANTED: &str = "OK";

/// Payload prefix for an authorized read while transponders are disabled.
pub const EVENT_DISABLED: &str = "DISABLED";

/// Payload prefix for an unknown or unauthorized transponder.
pub const EVENT_DENIED: &str = "NOK";

/// Separator between payload fields.
pub const EVENT_FIELD_SEPARATOR: char = '|';

/// Switch state posted back to the open-door item once the pulse was issued.
pub const SWITCH_OFF: &str = "OFF";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relay_commands_are_framed() {
        for command in [
            LESER7PLUS_RELAY_OPEN,
            LESER7PLUS_RELAY_CLOSE,
            LESER9_RELAY_OPEN,
            LESER9_RELAY_CLOSE,
        ] {
            assert_eq!(command[0], START_BYTE);
            assert_eq!(command[command.len() - 1], END_BYTE);
        }
    }

    #[test]
    fn test_relay_command_bytes() {
        assert_eq!(&LESER7PLUS_RELAY_OPEN[1..8], b"FFCR152");
        assert_eq!(&LESER7PLUS_RELAY_CLOSE[1..8], b"FFCR051");
        assert_eq!(LESER9_RELAY_OPEN, &[0x02, b'R', b'1', 0x04]);
        assert_eq!(LESER9_RELAY_CLOSE, &[0x02, b'R', b'0', 0x04]);
    }
}
