//! Monotonic capture clock

use std::time::Instant;

/// Microsecond clock with strictly increasing readings
///
/// Wraps `Instant` so that two frames processed within the same
/// microsecond still receive distinct, ordered timestamps.
pub struct MonotonicClock {
    origin: Instant,
    last_us: u64,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            last_us: 0,
        }
    }

    /// Next timestamp; strictly greater than every previous reading
    pub fn now_us(&mut self) -> u64 {
        let elapsed = self.origin.elapsed().as_micros() as u64;
        let stamp = elapsed.max(self.last_us + 1);
        self.last_us = stamp;
        stamp
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_readings_strictly_increase() {
        let mut clock = MonotonicClock::new();
        let mut prev = clock.now_us();
        for _ in 0..10_000 {
            let next = clock.now_us();
            assert!(next > prev, "{next} must exceed {prev}");
            prev = next;
        }
    }
}
