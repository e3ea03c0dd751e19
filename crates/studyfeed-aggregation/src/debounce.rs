//! Viewport proximity debouncing
//!
//! The viewport reports whether the end of the rendered feed is near. Only
//! rising edges (false → true) arm a trigger, and the trigger fires once the
//! signal has stayed up for the whole debounce window. A falling edge disarms
//! it. The sequencer's in-flight guard remains the correctness backstop; this
//! only absorbs bursts of scroll events.

use std::time::Duration;
use tokio::time::Instant;

/// Default debounce window
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(400);

#[derive(Debug, Clone)]
pub struct ProximityDebouncer {
    window: Duration,
    near_end: bool,
    deadline: Option<Instant>,
}

impl ProximityDebouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            near_end: false,
            deadline: None,
        }
    }

    /// Feed the latest viewport signal observed at `now`
    pub fn observe(&mut self, near_end: bool, now: Instant) {
        match (self.near_end, near_end) {
            (false, true) => self.deadline = Some(now + self.window),
            (true, false) => self.deadline = None,
            _ => {}
        }
        self.near_end = near_end;
    }

    /// When the armed trigger fires, if any
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Consume the trigger if its deadline has passed
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    /// Arm a new trigger if the signal is still up.
    ///
    /// A trigger that fires while a fetch is in flight is spent without
    /// effect, and a steady signal produces no new edge.
    pub fn rearm(&mut self, now: Instant) {
        if self.near_end {
            self.deadline = Some(now + self.window);
        }
    }

    /// Forget the signal history, e.g. when a new session starts
    pub fn reset(&mut self) {
        self.near_end = false;
        self.deadline = None;
    }

    pub fn is_near_end(&self) -> bool {
        self.near_end
    }
}

impl Default for ProximityDebouncer {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    #[test]
    fn test_rising_edge_arms_trigger() {
        let start = Instant::now();
        let mut debouncer = ProximityDebouncer::default();

        debouncer.observe(true, start);
        assert_eq!(debouncer.deadline(), Some(start + ms(400)));
        assert!(!debouncer.fire(start + ms(399)));
        assert!(debouncer.fire(start + ms(400)));

        // Fires only once per edge
        assert!(!debouncer.fire(start + ms(800)));
    }

    #[test]
    fn test_steady_high_signal_does_not_rearm() {
        let start = Instant::now();
        let mut debouncer = ProximityDebouncer::default();

        debouncer.observe(true, start);
        assert!(debouncer.fire(start + ms(400)));
        debouncer.observe(true, start + ms(500));
        assert_eq!(debouncer.deadline(), None);
    }

    #[test]
    fn test_falling_edge_disarms() {
        let start = Instant::now();
        let mut debouncer = ProximityDebouncer::default();

        debouncer.observe(true, start);
        debouncer.observe(false, start + ms(100));
        assert_eq!(debouncer.deadline(), None);
        assert!(!debouncer.fire(start + ms(1000)));
    }

    #[test]
    fn test_burst_restarts_window() {
        let start = Instant::now();
        let mut debouncer = ProximityDebouncer::new(ms(400));

        debouncer.observe(true, start);
        debouncer.observe(false, start + ms(50));
        debouncer.observe(true, start + ms(100));
        debouncer.observe(false, start + ms(150));
        debouncer.observe(true, start + ms(200));

        assert!(!debouncer.fire(start + ms(400)));
        assert!(debouncer.fire(start + ms(600)));
    }

    #[test]
    fn test_rearm_only_while_signal_up() {
        let start = Instant::now();
        let mut debouncer = ProximityDebouncer::default();

        debouncer.rearm(start);
        assert_eq!(debouncer.deadline(), None);

        debouncer.observe(true, start);
        assert!(debouncer.fire(start + ms(400)));
        debouncer.rearm(start + ms(1000));
        assert_eq!(debouncer.deadline(), Some(start + ms(1400)));
        assert!(debouncer.fire(start + ms(1400)));

        debouncer.observe(false, start + ms(1500));
        debouncer.rearm(start + ms(1600));
        assert_eq!(debouncer.deadline(), None);
    }

    #[test]
    fn test_reset_clears_history() {
        let start = Instant::now();
        let mut debouncer = ProximityDebouncer::default();
        debouncer.observe(true, start);
        debouncer.reset();

        assert!(!debouncer.is_near_end());
        assert_eq!(debouncer.deadline(), None);

        // A fresh rising edge is needed after reset
        debouncer.observe(true, start + ms(10));
        assert!(debouncer.deadline().is_some());
    }
}
