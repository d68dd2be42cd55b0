//! Eye Metrics
//!
//! Landmark-driven per-eye geometry:
//! - Eye region extraction (crop rectangles for the pupil locator)
//! - Eye aspect ratio and open/closed classification with hysteresis
//! - Blink events and blink-rate tracking
//!
//! Left and right eyes are classified independently; nothing in one eye's
//! state feeds the other's.

pub mod region;
pub mod state;

pub use region::{extract_regions, EyeRegion, EyeRegions, RegionConfig};
pub use state::{eye_aspect_ratio, EyeState, EyeStateConfig, EyeStateTracker};

use serde::{Deserialize, Serialize};

/// Which eye a region or state refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EyeSide {
    Left,
    Right,
}

impl EyeSide {
    pub fn label(&self) -> &'static str {
        match self {
            EyeSide::Left => "left",
            EyeSide::Right => "right",
        }
    }
}
