//! Debounce gate for repeated transponder reads.
//!
//! A transponder held in front of a reader is reported over and over. The
//! gate accepts one read and then suppresses every read of the session until
//! the window has fully elapsed.

use std::time::Duration;
use tokio::time::Instant;

/// Suppresses reads that follow an accepted read too closely.
///
/// The window is per session, not per transponder: a second card presented
/// inside the window is suppressed as well.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use strikeplate_access::DebounceGate;
/// use tokio::time::Instant;
///
/// let mut gate = DebounceGate::new(Duration::from_millis(15_000));
/// let t0 = Instant::now();
///
/// assert!(gate.accept(t0));
/// assert!(!gate.accept(t0 + Duration::from_millis(15_000)));
/// assert!(gate.accept(t0 + Duration::from_millis(15_001)));
/// ```
#[derive(Debug, Clone)]
pub struct DebounceGate {
    window: Duration,
    last_accepted: Option<Instant>,
}

impl DebounceGate {
    /// Create a gate that has not accepted any read yet.
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_accepted: None,
        }
    }

    /// Decide whether a read at `now` is processed.
    ///
    /// Accepts the first read, and afterwards only reads strictly more than
    /// `window` after the last accepted one. An accepted read restarts the
    /// window immediately.
    pub fn accept(&mut self, now: Instant) -> bool {
        let accepted = match self.last_accepted {
            None => true,
            // A clock running backwards never reopens the gate.
            Some(last) => now.saturating_duration_since(last) > self.window,
        };

        if accepted {
            self.last_accepted = Some(now);
        }
        accepted
    }

    /// The configured window.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// When the last read was accepted.
    pub fn last_accepted(&self) -> Option<Instant> {
        self.last_accepted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const WINDOW: Duration = Duration::from_millis(15_000);

    #[rstest]
    #[case(14_999, false)]
    #[case(15_000, false)]
    #[case(15_001, true)]
    #[case(60_000, true)]
    fn test_second_read(#[case] after_ms: u64, #[case] expected: bool) {
        let mut gate = DebounceGate::new(WINDOW);
        let t0 = Instant::now();

        assert!(gate.accept(t0));
        assert_eq!(gate.accept(t0 + Duration::from_millis(after_ms)), expected);
    }

    #[test]
    fn test_first_read_accepted() {
        let mut gate = DebounceGate::new(WINDOW);
        assert!(gate.last_accepted().is_none());

        let now = Instant::now();
        assert!(gate.accept(now));
        assert_eq!(gate.last_accepted(), Some(now));
    }

    #[test]
    fn test_rejected_read_does_not_extend_window() {
        let mut gate = DebounceGate::new(WINDOW);
        let t0 = Instant::now();

        assert!(gate.accept(t0));
        assert!(!gate.accept(t0 + Duration::from_millis(10_000)));
        assert!(gate.accept(t0 + Duration::from_millis(15_001)));
        assert_eq!(
            gate.last_accepted(),
            Some(t0 + Duration::from_millis(15_001))
        );
    }

    #[test]
    fn test_earlier_instant_rejected() {
        let t0 = Instant::now();
        let mut gate = DebounceGate::new(WINDOW);

        assert!(gate.accept(t0 + Duration::from_millis(20_000)));
        assert!(!gate.accept(t0));
    }

    #[test]
    fn test_zero_window() {
        let mut gate = DebounceGate::new(Duration::ZERO);
        let t0 = Instant::now();

        assert!(gate.accept(t0));
        assert!(!gate.accept(t0));
        assert!(gate.accept(t0 + Duration::from_millis(1)));
    }
}
