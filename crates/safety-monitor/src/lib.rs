//! Safety Monitor
//!
//! Two alarm state machines driven once per processed frame:
//! - Out-of-frame: consecutive frames without a detected face
//! - Drowsiness: PERCLOS over a time-bounded sliding window
//!
//! Alarms are derived state. Transitions are edge-triggered: an alarm
//! raising or clearing is reported exactly once as a `SafetyEvent`, while
//! `SafetyState` always reflects the current values.

pub mod drowsiness;
pub mod presence;

pub use drowsiness::DrowsinessMonitor;
pub use presence::PresenceMonitor;

use serde::{Deserialize, Serialize};

/// Safety monitor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyConfig {
    /// Consecutive face-less frames before the out-of-frame alarm raises
    pub out_of_frame_grace_frames: u32,
    /// Sliding PERCLOS window length, seconds
    pub perclos_window_seconds: f32,
    /// PERCLOS fraction above which the drowsiness alarm raises
    pub perclos_alarm_fraction: f32,
    /// PERCLOS fraction below which the drowsiness alarm clears
    pub perclos_clear_fraction: f32,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            out_of_frame_grace_frames: 5,
            perclos_window_seconds: 10.0,
            perclos_alarm_fraction: 0.7,
            perclos_clear_fraction: 0.6,
        }
    }
}

/// Edge-triggered alarm transitions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SafetyEvent {
    OutOfFrameRaised { consecutive_misses: u32 },
    OutOfFrameCleared,
    DrowsinessRaised { perclos: f32 },
    DrowsinessCleared { perclos: f32 },
}

/// Current alarm state snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SafetyState {
    /// Drowsiness alarm active
    pub drowsiness_alarm: bool,
    /// Current PERCLOS value in [0, 1]
    pub perclos: f32,
    /// Out-of-frame alarm active
    pub out_of_frame_alarm: bool,
    /// Consecutive frames without a face
    pub consecutive_misses: u32,
}

/// Combined per-frame safety monitor
pub struct SafetyMonitor {
    presence: PresenceMonitor,
    drowsiness: DrowsinessMonitor,
}

impl SafetyMonitor {
    pub fn new(config: SafetyConfig) -> Self {
        Self {
            presence: PresenceMonitor::new(config.out_of_frame_grace_frames),
            drowsiness: DrowsinessMonitor::new(
                config.perclos_window_seconds,
                config.perclos_alarm_fraction,
                config.perclos_clear_fraction,
            ),
        }
    }

    /// Feed one frame; returns the transitions that occurred on it
    pub fn update(
        &mut self,
        face_detected: bool,
        both_eyes_closed: bool,
        timestamp_us: u64,
    ) -> Vec<SafetyEvent> {
        let mut events = Vec::new();
        if let Some(event) = self.presence.update(face_detected) {
            events.push(event);
        }
        if let Some(event) = self.drowsiness.update(both_eyes_closed, timestamp_us) {
            events.push(event);
        }
        events
    }

    /// Current alarm state
    pub fn state(&self) -> SafetyState {
        SafetyState {
            drowsiness_alarm: self.drowsiness.alarm(),
            perclos: self.drowsiness.perclos(),
            out_of_frame_alarm: self.presence.alarm(),
            consecutive_misses: self.presence.consecutive_misses(),
        }
    }

    /// Clear all alarm state and history
    pub fn reset(&mut self) {
        self.presence.reset();
        self.drowsiness.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME_US: u64 = 10_000;

    #[test]
    fn test_out_of_frame_scenario_grace_five() {
        // 10 frames with a face, then 30 without (grace = 5): the alarm
        // transitions exactly once, on the 5th consecutive miss, and back
        // on the first face frame.
        let mut monitor = SafetyMonitor::new(SafetyConfig::default());
        let mut raised_at = Vec::new();
        let mut cleared_at = Vec::new();

        for frame in 1u32..=41 {
            let face = frame <= 10 || frame > 40;
            let events = monitor.update(face, false, frame as u64 * FRAME_US);
            for event in events {
                match event {
                    SafetyEvent::OutOfFrameRaised { .. } => raised_at.push(frame),
                    SafetyEvent::OutOfFrameCleared => cleared_at.push(frame),
                    _ => {}
                }
            }
        }

        assert_eq!(raised_at, vec![15]);
        assert_eq!(cleared_at, vec![41]);
        assert!(!monitor.state().out_of_frame_alarm);
    }

    #[test]
    fn test_drowsiness_raises_and_clears_once() {
        let config = SafetyConfig {
            perclos_window_seconds: 1.0,
            ..Default::default()
        };
        let mut monitor = SafetyMonitor::new(config);

        let mut raised = 0;
        let mut cleared = 0;
        let mut t = 0u64;

        // Eyes closed across the whole window.
        for _ in 0..200 {
            t += FRAME_US;
            for event in monitor.update(true, true, t) {
                if matches!(event, SafetyEvent::DrowsinessRaised { .. }) {
                    raised += 1;
                }
            }
        }
        assert_eq!(raised, 1);
        assert!(monitor.state().drowsiness_alarm);
        assert!(monitor.state().perclos > 0.9);

        // Eyes open until PERCLOS falls below the clear threshold.
        for _ in 0..200 {
            t += FRAME_US;
            for event in monitor.update(true, false, t) {
                if matches!(event, SafetyEvent::DrowsinessCleared { .. }) {
                    cleared += 1;
                }
            }
        }
        assert_eq!(cleared, 1);
        assert!(!monitor.state().drowsiness_alarm);
    }

    #[test]
    fn test_reset_clears_alarms() {
        let mut monitor = SafetyMonitor::new(SafetyConfig::default());
        for frame in 0..10 {
            monitor.update(false, false, frame * FRAME_US);
        }
        assert!(monitor.state().out_of_frame_alarm);

        monitor.reset();
        let state = monitor.state();
        assert!(!state.out_of_frame_alarm);
        assert_eq!(state.consecutive_misses, 0);
        assert_eq!(state.perclos, 0.0);
    }
}
