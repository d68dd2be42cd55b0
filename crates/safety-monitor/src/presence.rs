//! Out-of-frame alarm state machine

use crate::SafetyEvent;
use tracing::{info, warn};

/// Consecutive-miss counter with an edge-triggered alarm
///
/// The alarm raises once the miss count reaches the grace count and clears
/// on the first frame with a detected face.
pub struct PresenceMonitor {
    grace_frames: u32,
    consecutive_misses: u32,
    alarm: bool,
}

impl PresenceMonitor {
    pub fn new(grace_frames: u32) -> Self {
        Self {
            grace_frames: grace_frames.max(1),
            consecutive_misses: 0,
            alarm: false,
        }
    }

    /// Feed one frame's face-detected flag
    pub fn update(&mut self, face_detected: bool) -> Option<SafetyEvent> {
        if face_detected {
            self.consecutive_misses = 0;
            if self.alarm {
                self.alarm = false;
                info!("Subject back in frame");
                return Some(SafetyEvent::OutOfFrameCleared);
            }
            return None;
        }

        self.consecutive_misses += 1;
        if !self.alarm && self.consecutive_misses >= self.grace_frames {
            self.alarm = true;
            warn!(
                "Subject out of frame for {} consecutive frames",
                self.consecutive_misses
            );
            return Some(SafetyEvent::OutOfFrameRaised {
                consecutive_misses: self.consecutive_misses,
            });
        }
        None
    }

    pub fn alarm(&self) -> bool {
        self.alarm
    }

    pub fn consecutive_misses(&self) -> u32 {
        self.consecutive_misses
    }

    pub fn reset(&mut self) {
        self.consecutive_misses = 0;
        self.alarm = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alarm_edge_triggered() {
        let mut monitor = PresenceMonitor::new(3);

        assert!(monitor.update(false).is_none());
        assert!(monitor.update(false).is_none());
        assert!(matches!(
            monitor.update(false),
            Some(SafetyEvent::OutOfFrameRaised {
                consecutive_misses: 3
            })
        ));
        // Still absent: no repeated event.
        assert!(monitor.update(false).is_none());
        assert_eq!(monitor.consecutive_misses(), 4);

        assert!(matches!(
            monitor.update(true),
            Some(SafetyEvent::OutOfFrameCleared)
        ));
        assert!(monitor.update(true).is_none());
    }

    #[test]
    fn test_brief_loss_below_grace_is_silent() {
        let mut monitor = PresenceMonitor::new(5);
        for _ in 0..4 {
            assert!(monitor.update(false).is_none());
        }
        assert!(monitor.update(true).is_none());
        assert!(!monitor.alarm());
    }
}
