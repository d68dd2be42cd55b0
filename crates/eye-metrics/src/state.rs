//! Per-eye open/closed classification with hysteresis and blink tracking

use crate::EyeSide;
use landmark_tracker::{indices, LandmarkSet};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::debug;

/// Blink-rate accounting window (microseconds)
const BLINK_RATE_WINDOW_US: u64 = 60_000_000;

/// Eye state classifier configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EyeStateConfig {
    /// EAR below this value reads as a closing eye
    pub ear_threshold: f32,
    /// Consecutive frames required to confirm a transition
    pub hysteresis_frames: u32,
    /// Minimum confirmed-closed run that counts as a blink
    pub min_blink_frames: u32,
    /// Maximum confirmed-closed run that counts as a blink
    pub max_blink_frames: u32,
}

impl Default for EyeStateConfig {
    fn default() -> Self {
        Self {
            ear_threshold: 0.22,
            hysteresis_frames: 2,
            min_blink_frames: 1,
            max_blink_frames: 15,
        }
    }
}

/// Snapshot of one eye's classification for a frame
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EyeState {
    /// Confirmed open/closed state
    pub open: bool,
    /// EAR measured this frame, when landmarks were available
    pub ear: Option<f32>,
    /// Completed blink count since tracking started
    pub blink_count: u64,
    /// Blink rate over the trailing minute
    pub blinks_per_minute: f32,
}

/// Compute the eye aspect ratio for one eye from landmarks
///
/// EAR is the mean of the two vertical lid distances over the
/// corner-to-corner distance. Degenerate horizontal geometry yields `None`.
pub fn eye_aspect_ratio(set: &LandmarkSet, side: EyeSide) -> Option<f32> {
    let (outer, inner, top1, bottom1, top2, bottom2) = match side {
        EyeSide::Left => (
            indices::LEFT_EYE_OUTER,
            indices::LEFT_EYE_INNER,
            indices::LEFT_EYE_TOP_1,
            indices::LEFT_EYE_BOTTOM_1,
            indices::LEFT_EYE_TOP_2,
            indices::LEFT_EYE_BOTTOM_2,
        ),
        EyeSide::Right => (
            indices::RIGHT_EYE_OUTER,
            indices::RIGHT_EYE_INNER,
            indices::RIGHT_EYE_TOP_1,
            indices::RIGHT_EYE_BOTTOM_1,
            indices::RIGHT_EYE_TOP_2,
            indices::RIGHT_EYE_BOTTOM_2,
        ),
    };

    let h = set.distance(outer, inner)?;
    if h < 1e-4 {
        return None;
    }
    let v1 = set.distance(top1, bottom1)?;
    let v2 = set.distance(top2, bottom2)?;
    Some((v1 + v2) / (2.0 * h))
}

/// Stateful open/closed tracker for a single eye
///
/// Transitions are confirmed only after the EAR condition holds for
/// `hysteresis_frames` consecutive frames, so single-frame flicker never
/// toggles the state. Each tracker owns its own counters; left and right
/// never share one.
pub struct EyeStateTracker {
    side: EyeSide,
    config: EyeStateConfig,
    open: bool,
    ear: Option<f32>,
    below_streak: u32,
    above_streak: u32,
    closed_frames: u32,
    blink_count: u64,
    blink_times_us: VecDeque<u64>,
}

impl EyeStateTracker {
    pub fn new(side: EyeSide, config: EyeStateConfig) -> Self {
        Self {
            side,
            config,
            open: true,
            ear: None,
            below_streak: 0,
            above_streak: 0,
            closed_frames: 0,
            blink_count: 0,
            blink_times_us: VecDeque::new(),
        }
    }

    /// Feed one frame's EAR; returns true when a blink completed this frame
    pub fn update(&mut self, ear: f32, timestamp_us: u64) -> bool {
        self.ear = Some(ear);

        if ear < self.config.ear_threshold {
            self.below_streak += 1;
            self.above_streak = 0;
        } else {
            self.above_streak += 1;
            self.below_streak = 0;
        }

        let mut blinked = false;
        if self.open {
            if self.below_streak >= self.config.hysteresis_frames {
                self.open = false;
                self.closed_frames = self.below_streak;
                debug!("{} eye confirmed closed (ear {:.3})", self.side.label(), ear);
            }
        } else {
            if ear < self.config.ear_threshold {
                self.closed_frames += 1;
            }
            if self.above_streak >= self.config.hysteresis_frames {
                self.open = true;
                let run = self.closed_frames;
                self.closed_frames = 0;
                if run >= self.config.min_blink_frames && run <= self.config.max_blink_frames {
                    self.blink_count += 1;
                    self.blink_times_us.push_back(timestamp_us);
                    blinked = true;
                    debug!(
                        "{} eye blink #{} ({} closed frames)",
                        self.side.label(),
                        self.blink_count,
                        run
                    );
                }
            }
        }

        let cutoff = timestamp_us.saturating_sub(BLINK_RATE_WINDOW_US);
        while let Some(&t) = self.blink_times_us.front() {
            if t < cutoff {
                self.blink_times_us.pop_front();
            } else {
                break;
            }
        }

        blinked
    }

    /// Landmarks absent this frame: the state holds, the EAR does not
    pub fn mark_unobserved(&mut self) {
        self.ear = None;
        self.below_streak = 0;
        self.above_streak = 0;
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn side(&self) -> EyeSide {
        self.side
    }

    /// Current state snapshot for record assembly
    pub fn snapshot(&self, now_us: u64) -> EyeState {
        let window_start = now_us.saturating_sub(BLINK_RATE_WINDOW_US);
        let recent = self
            .blink_times_us
            .iter()
            .filter(|&&t| t >= window_start)
            .count();
        let span_s = if let Some(&first) = self.blink_times_us.front() {
            ((now_us.saturating_sub(first)) as f32 / 1_000_000.0).clamp(1.0, 60.0)
        } else {
            60.0
        };

        EyeState {
            open: self.open,
            ear: self.ear,
            blink_count: self.blink_count,
            blinks_per_minute: recent as f32 / span_s * 60.0,
        }
    }

    /// Clear all temporal state (recalibration / tracking restart)
    pub fn reset(&mut self) {
        self.open = true;
        self.ear = None;
        self.below_streak = 0;
        self.above_streak = 0;
        self.closed_frames = 0;
        self.blink_count = 0;
        self.blink_times_us.clear();
    }
}
