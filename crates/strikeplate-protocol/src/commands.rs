//! Relay command vocabulary.
//!
//! Every reader drives a door strike relay through its serial line. A door
//! opening is a pulse: the open command, a hold period, then the close
//! command. The Leser 7plus relay board occasionally misses a single close
//! command, so it gets the close command a second time after another hold.
//!
//! ```text
//! Leser 7plus:  OPEN ──1s── CLOSE ──1s── CLOSE
//! Leser 9:      OPEN ──1s── CLOSE
//! ```

use std::time::Duration;
use strikeplate_core::{
    ReaderVariant,
    constants::{
        DEFAULT_RELAY_HOLD_MS, LESER7PLUS_RELAY_CLOSE, LESER7PLUS_RELAY_OPEN, LESER9_RELAY_CLOSE,
        LESER9_RELAY_OPEN,
    },
};

/// One step of a relay pulse sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayStep {
    /// Write the command bytes and flush.
    Write(&'static [u8]),

    /// Keep the relay in its current state.
    Hold(Duration),
}

/// Relay pulse parameters for one reader variant.
///
/// # Examples
///
/// ```
/// use strikeplate_core::ReaderVariant;
/// use strikeplate_protocol::{RelayPulseSpec, RelayStep};
///
/// let spec = RelayPulseSpec::for_variant(ReaderVariant::Leser9);
/// let writes = spec
///     .steps()
///     .iter()
///     .filter(|step| matches!(step, RelayStep::Write(_)))
///     .count();
/// assert_eq!(writes, 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayPulseSpec {
    /// Bytes that energize the relay.
    pub open_command: &'static [u8],

    /// Bytes that release the relay.
    pub close_command: &'static [u8],

    /// Time between consecutive commands.
    pub hold: Duration,

    /// Send the close command a second time after another hold.
    pub repeat_close: bool,
}

impl RelayPulseSpec {
    /// Pulse parameters of `variant` with the default hold time.
    pub fn for_variant(variant: ReaderVariant) -> Self {
        let (open_command, close_command) = match variant {
            ReaderVariant::Leser7Plus => (LESER7PLUS_RELAY_OPEN, LESER7PLUS_RELAY_CLOSE),
            ReaderVariant::Leser9 => (LESER9_RELAY_OPEN, LESER9_RELAY_CLOSE),
        };

        Self {
            open_command,
            close_command,
            hold: Duration::from_millis(DEFAULT_RELAY_HOLD_MS),
            repeat_close: variant.confirms_relay_close(),
        }
    }

    /// Override the hold time.
    pub fn with_hold(mut self, hold: Duration) -> Self {
        self.hold = hold;
        self
    }

    /// The complete pulse as an ordered list of steps.
    pub fn steps(&self) -> Vec<RelayStep> {
        let mut steps = vec![
            RelayStep::Write(self.open_command),
            RelayStep::Hold(self.hold),
            RelayStep::Write(self.close_command),
        ];

        if self.repeat_close {
            steps.push(RelayStep::Hold(self.hold));
            steps.push(RelayStep::Write(self.close_command));
        }

        steps
    }

    /// Total time the pulse keeps the worker busy.
    pub fn duration(&self) -> Duration {
        self.steps()
            .iter()
            .map(|step| match step {
                RelayStep::Hold(d) => *d,
                RelayStep::Write(_) => Duration::ZERO,
            })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leser7plus_sequence() {
        let spec = RelayPulseSpec::for_variant(ReaderVariant::Leser7Plus);
        let hold = Duration::from_millis(1000);

        assert_eq!(
            spec.steps(),
            vec![
                RelayStep::Write(b"\x02FFCR152\x04"),
                RelayStep::Hold(hold),
                RelayStep::Write(b"\x02FFCR051\x04"),
                RelayStep::Hold(hold),
                RelayStep::Write(b"\x02FFCR051\x04"),
            ]
        );
        assert_eq!(spec.duration(), Duration::from_secs(2));
    }

    #[test]
    fn test_leser9_sequence() {
        let spec = RelayPulseSpec::for_variant(ReaderVariant::Leser9);

        assert_eq!(
            spec.steps(),
            vec![
                RelayStep::Write(b"\x02R1\x04"),
                RelayStep::Hold(Duration::from_millis(1000)),
                RelayStep::Write(b"\x02R0\x04"),
            ]
        );
        assert_eq!(spec.duration(), Duration::from_secs(1));
    }

    #[test]
    fn test_custom_hold() {
        let spec = RelayPulseSpec::for_variant(ReaderVariant::Leser7Plus)
            .with_hold(Duration::from_millis(250));
        assert_eq!(spec.duration(), Duration::from_millis(500));
    }
}
