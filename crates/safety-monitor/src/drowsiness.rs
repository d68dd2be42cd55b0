//! PERCLOS drowsiness alarm
//!
//! Maintains a time-bounded window of (timestamp, both-eyes-closed)
//! samples. PERCLOS is the time-weighted closed fraction of the window, so
//! it stays correct under variable frame rate. Raise and clear use separate
//! thresholds to avoid oscillation around a single boundary.

use crate::SafetyEvent;
use std::collections::VecDeque;
use tracing::{info, warn};

/// Eye closure sample with its capture timestamp
#[derive(Debug, Clone, Copy)]
struct ClosureSample {
    timestamp_us: u64,
    closed: bool,
}

/// Sliding-window PERCLOS monitor
pub struct DrowsinessMonitor {
    window_us: u64,
    alarm_fraction: f32,
    clear_fraction: f32,
    samples: VecDeque<ClosureSample>,
    perclos: f32,
    alarm: bool,
}

impl DrowsinessMonitor {
    pub fn new(window_seconds: f32, alarm_fraction: f32, clear_fraction: f32) -> Self {
        Self {
            window_us: (window_seconds.max(0.1) * 1_000_000.0) as u64,
            alarm_fraction,
            clear_fraction: clear_fraction.min(alarm_fraction),
            samples: VecDeque::with_capacity(1024),
            perclos: 0.0,
            alarm: false,
        }
    }

    /// Feed one frame's both-eyes-closed flag
    pub fn update(&mut self, closed: bool, timestamp_us: u64) -> Option<SafetyEvent> {
        self.samples.push_back(ClosureSample {
            timestamp_us,
            closed,
        });

        let cutoff = timestamp_us.saturating_sub(self.window_us);
        while let Some(front) = self.samples.front() {
            if front.timestamp_us < cutoff {
                self.samples.pop_front();
            } else {
                break;
            }
        }

        self.perclos = self.compute_perclos();

        if !self.alarm && self.warmed_up() && self.perclos > self.alarm_fraction {
            self.alarm = true;
            warn!("Drowsiness alarm raised (PERCLOS {:.2})", self.perclos);
            return Some(SafetyEvent::DrowsinessRaised {
                perclos: self.perclos,
            });
        }
        if self.alarm && self.perclos < self.clear_fraction {
            self.alarm = false;
            info!("Drowsiness alarm cleared (PERCLOS {:.2})", self.perclos);
            return Some(SafetyEvent::DrowsinessCleared {
                perclos: self.perclos,
            });
        }
        None
    }

    /// Current PERCLOS value, always in [0, 1]
    pub fn perclos(&self) -> f32 {
        self.perclos
    }

    pub fn alarm(&self) -> bool {
        self.alarm
    }

    pub fn reset(&mut self) {
        self.samples.clear();
        self.perclos = 0.0;
        self.alarm = false;
    }

    /// Enough history to trust the window: at least half its span
    fn warmed_up(&self) -> bool {
        match (self.samples.front(), self.samples.back()) {
            (Some(first), Some(last)) => {
                last.timestamp_us.saturating_sub(first.timestamp_us) >= self.window_us / 2
            }
            _ => false,
        }
    }

    /// Time-weighted closed fraction: each inter-sample gap counts as
    /// closed time when the earlier sample was closed.
    fn compute_perclos(&self) -> f32 {
        if self.samples.len() < 2 {
            return 0.0;
        }

        let mut closed_us = 0u64;
        let mut total_us = 0u64;
        let mut iter = self.samples.iter();
        let mut prev = match iter.next() {
            Some(s) => s,
            None => return 0.0,
        };

        for curr in iter {
            let dt = curr.timestamp_us.saturating_sub(prev.timestamp_us);
            if dt > 0 {
                total_us += dt;
                if prev.closed {
                    closed_us += dt;
                }
            }
            prev = curr;
        }

        if total_us == 0 {
            return 0.0;
        }
        (closed_us as f32 / total_us as f32).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const FRAME_US: u64 = 10_000;

    #[test]
    fn test_perclos_tracks_closed_fraction() {
        let mut monitor = DrowsinessMonitor::new(10.0, 0.7, 0.6);
        // Alternate closed/open at a fixed rate: PERCLOS settles near 0.5.
        for i in 0..1000u64 {
            monitor.update(i % 2 == 0, i * FRAME_US);
        }
        assert!((monitor.perclos() - 0.5).abs() < 0.05, "{}", monitor.perclos());
    }

    #[test]
    fn test_eviction_is_time_based() {
        let mut monitor = DrowsinessMonitor::new(1.0, 0.7, 0.6);

        // Closed samples spanning the full window.
        let mut t = 0u64;
        for _ in 0..150 {
            t += FRAME_US;
            monitor.update(true, t);
        }
        assert!(monitor.perclos() > 0.9);

        // Open samples at a slower frame rate still displace the window.
        for _ in 0..50 {
            t += 4 * FRAME_US;
            monitor.update(false, t);
        }
        assert!(monitor.perclos() < 0.1, "{}", monitor.perclos());
    }

    #[test]
    fn test_no_alarm_before_warm_up() {
        let mut monitor = DrowsinessMonitor::new(10.0, 0.7, 0.6);
        // A handful of closed frames is not yet evidence of drowsiness.
        for i in 0..5u64 {
            assert!(monitor.update(true, i * FRAME_US).is_none());
        }
        assert!(!monitor.alarm());
    }

    #[test]
    fn test_separate_clear_threshold_prevents_oscillation() {
        let mut monitor = DrowsinessMonitor::new(1.0, 0.7, 0.5);
        let mut t = 0u64;
        let mut transitions = 0;

        for _ in 0..200 {
            t += FRAME_US;
            if monitor.update(true, t).is_some() {
                transitions += 1;
            }
        }
        // Hover just under the raise threshold from above: stays raised
        // until the clear threshold is crossed.
        for i in 0..60 {
            t += FRAME_US;
            if monitor.update(i % 3 != 0, t).is_some() {
                transitions += 1;
            }
        }
        assert_eq!(transitions, 1, "alarm must not flap between thresholds");
    }

    proptest! {
        /// PERCLOS lies in [0, 1] for any sample history.
        #[test]
        fn prop_perclos_bounded(
            flags in proptest::collection::vec(any::<bool>(), 1..200),
            gaps in proptest::collection::vec(1u64..100_000, 1..200),
        ) {
            let mut monitor = DrowsinessMonitor::new(5.0, 0.7, 0.6);
            let mut t = 0u64;
            for (flag, gap) in flags.iter().zip(gaps.iter().cycle()) {
                t += gap;
                monitor.update(*flag, t);
                prop_assert!((0.0..=1.0).contains(&monitor.perclos()));
            }
        }
    }
}
