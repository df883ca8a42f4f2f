//! Simulated millisecond clock

use std::cell::Cell;

use uartboot_core::programmer::Clock;

/// Deterministic clock for deadline tests
///
/// Time only moves when [`advance`](SimClock::advance) is called, or by
/// `step` milliseconds on every read if the clock was built with
/// [`stepping`](SimClock::stepping).
#[derive(Debug, Default)]
pub struct SimClock {
    now: Cell<u64>,
    step: u64,
    reads: Cell<u64>,
}

impl SimClock {
    /// A frozen clock at t = 0
    pub fn new() -> Self {
        Self::default()
    }

    /// A clock that moves forward `step_ms` on every read
    pub fn stepping(step_ms: u64) -> Self {
        Self {
            step: step_ms,
            ..Self::default()
        }
    }

    /// Move time forward
    pub fn advance(&self, ms: u64) {
        self.now.set(self.now.get() + ms);
    }

    /// Current time without stepping
    pub fn peek(&self) -> u64 {
        self.now.get()
    }

    /// Number of `now_ms` calls so far
    pub fn reads(&self) -> u64 {
        self.reads.get()
    }
}

impl Clock for SimClock {
    fn now_ms(&self) -> u64 {
        let t = self.now.get();
        self.now.set(t + self.step);
        self.reads.set(self.reads.get() + 1);
        t
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stepping() {
        let clock = SimClock::stepping(10);
        assert_eq!(clock.now_ms(), 0);
        assert_eq!(clock.now_ms(), 10);
        clock.advance(5);
        assert_eq!(clock.peek(), 25);
        assert_eq!(clock.reads(), 2);
    }
}
