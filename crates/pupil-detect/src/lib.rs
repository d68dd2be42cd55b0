//! Pupil Detection
//!
//! Sub-pixel pupil localization on eye crops:
//! - edge-preserving smoothing and locally-adaptive binarization
//! - morphological clean-up and contour enumeration
//! - plausibility-filtered contour selection and ellipse fitting
//!
//! Thresholds adapt per user through a two-phase calibration profile:
//! `collecting` over an initial frame window, then `frozen` until an
//! explicit recalibration.
//!
//! A pupil that cannot be found is an ordinary per-frame outcome; the
//! observation is simply absent, never zeroed.

pub mod calibration;
pub mod locator;

pub use calibration::{CalibrationConfig, CalibrationManager, ThresholdParams};
pub use locator::{locate_in_region, LocatorConfig, PupilLocator};

use serde::{Deserialize, Serialize};

/// A valid pupil measurement for one eye in one frame
///
/// `diameter` is always finite and >= 0; an eye without a measurement has
/// no `PupilObservation` at all.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PupilObservation {
    /// Pupil center in frame coordinates, sub-pixel
    pub center: (f32, f32),
    /// Pupil diameter in pixels
    pub diameter: f32,
}
