//! Decision pacing in simulated time.

use qtty::{Quantity, Second};

/// Decides which native ticks become decision ticks.
///
/// A tick is processed once at least `interval` of game time has passed
/// since the previous processed tick; the first one comes at `interval`.
#[derive(Debug, Clone, Copy)]
pub struct DecisionClock {
    interval: Quantity<Second>,
    ceiling: Quantity<Second>,
    last: Quantity<Second>,
}

impl DecisionClock {
    pub fn new(interval: Quantity<Second>, ceiling: Quantity<Second>) -> Self {
        Self {
            interval,
            ceiling,
            last: Quantity::new(0.0),
        }
    }

    /// Returns `true` and records `now` if a decision is due.
    pub fn tick(&mut self, now: Quantity<Second>) -> bool {
        if (now - self.last).value() < self.interval.value() {
            return false;
        }
        self.last = now;
        true
    }

    /// True once `now` is strictly past the ceiling.
    pub fn exceeded(&self, now: Quantity<Second>) -> bool {
        now.value() > self.ceiling.value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: f64) -> Quantity<Second> {
        Quantity::new(v)
    }

    #[test]
    fn throttles_to_interval() {
        let mut clock = DecisionClock::new(s(0.5), s(60.0));
        assert!(!clock.tick(s(0.0)));
        assert!(!clock.tick(s(0.4)));
        assert!(clock.tick(s(0.5)));
        assert!(!clock.tick(s(0.9)));
        assert!(clock.tick(s(1.2)));
        assert!(!clock.tick(s(1.6)));
        assert!(clock.tick(s(1.7)));
    }

    #[test]
    fn ceiling_is_strict() {
        let clock = DecisionClock::new(s(0.5), s(1800.0));
        assert!(!clock.exceeded(s(1800.0)));
        assert!(clock.exceeded(s(1800.5)));
    }
}
