//! Two-phase per-user calibration
//!
//! The profile collects ambient brightness and observed pupil sizes over an
//! initial window of tracked frames, derives binarization and plausibility
//! parameters, and freezes. Frozen parameters are immutable until an
//! explicit recalibration request. Frames without a face contribute nothing;
//! the window extends until enough samples exist, which is a recoverable
//! condition rather than an error.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Calibration window configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationConfig {
    /// Tracked frames the collecting phase nominally spans
    pub calibration_frames: u32,
    /// Samples required before the profile may freeze
    pub min_samples: u32,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            calibration_frames: 20,
            min_samples: 20,
        }
    }
}

/// Parameters the pupil locator consumes
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ThresholdParams {
    /// Subtracted from the local mean during binarization; higher values
    /// demand darker pupils
    pub threshold_offset: i16,
    /// Smallest believable pupil diameter, pixels
    pub min_diameter_px: f32,
    /// Largest believable pupil diameter, pixels
    pub max_diameter_px: f32,
}

impl Default for ThresholdParams {
    fn default() -> Self {
        Self {
            threshold_offset: 10,
            min_diameter_px: 2.0,
            max_diameter_px: 60.0,
        }
    }
}

/// Accumulated statistics while collecting
#[derive(Debug, Clone, Default)]
struct Samples {
    brightness: Vec<f32>,
    diameters: Vec<f32>,
    frames_observed: u32,
}

impl Samples {
    fn mean_brightness(&self) -> Option<f32> {
        if self.brightness.is_empty() {
            return None;
        }
        Some(self.brightness.iter().sum::<f32>() / self.brightness.len() as f32)
    }

    fn diameter_stats(&self) -> Option<(f32, f32)> {
        if self.diameters.len() < 2 {
            return None;
        }
        let n = self.diameters.len() as f32;
        let mean = self.diameters.iter().sum::<f32>() / n;
        let var = self
            .diameters
            .iter()
            .map(|d| (d - mean).powi(2))
            .sum::<f32>()
            / n;
        Some((mean, var.sqrt()))
    }
}

/// Calibration phase: mutable statistics or frozen parameters
#[derive(Debug, Clone)]
enum Phase {
    Collecting(Samples),
    Frozen(ThresholdParams),
}

/// Owner of the calibration profile
///
/// Mutated only by the processing cycle; the single `params()` accessor
/// enforces the phase rule for every consumer.
pub struct CalibrationManager {
    config: CalibrationConfig,
    phase: Phase,
}

impl CalibrationManager {
    pub fn new(config: CalibrationConfig) -> Self {
        Self {
            config,
            phase: Phase::Collecting(Samples::default()),
        }
    }

    /// Whether the profile has frozen
    pub fn is_frozen(&self) -> bool {
        matches!(self.phase, Phase::Frozen(_))
    }

    /// Parameters for the pupil locator
    ///
    /// Defaults while collecting, the derived profile once frozen.
    pub fn params(&self) -> ThresholdParams {
        match &self.phase {
            Phase::Collecting(_) => ThresholdParams::default(),
            Phase::Frozen(params) => *params,
        }
    }

    /// Feed one tracked frame's statistics
    ///
    /// `brightness` is the eye-crop mean luminance when a face was present;
    /// `diameter` the pupil diameter when one was located. No-ops once
    /// frozen.
    pub fn observe(&mut self, brightness: Option<f32>, diameter: Option<f32>) {
        let Phase::Collecting(samples) = &mut self.phase else {
            return;
        };

        samples.frames_observed += 1;
        if let Some(b) = brightness {
            samples.brightness.push(b);
        }
        if let Some(d) = diameter {
            samples.diameters.push(d);
        }

        let have = samples.brightness.len() as u32;
        if samples.frames_observed >= self.config.calibration_frames {
            if have >= self.config.min_samples {
                let params = derive_params(samples);
                info!(
                    "Calibration frozen after {} frames ({} samples): {:?}",
                    samples.frames_observed, have, params
                );
                self.phase = Phase::Frozen(params);
            } else {
                debug!(
                    "Calibration window extended: {} of {} samples after {} frames",
                    have, self.config.min_samples, samples.frames_observed
                );
            }
        }
    }

    /// Reset to collecting and clear accumulated statistics
    pub fn recalibrate(&mut self) {
        info!("Recalibration requested; profile reset to collecting");
        self.phase = Phase::Collecting(Samples::default());
    }
}

/// Derive locator parameters from collected statistics
fn derive_params(samples: &Samples) -> ThresholdParams {
    let defaults = ThresholdParams::default();

    // Brighter scenes separate pupil from iris with a stronger offset.
    let threshold_offset = samples
        .mean_brightness()
        .map(|b| (b * 0.08).clamp(5.0, 25.0) as i16)
        .unwrap_or(defaults.threshold_offset);

    let (min_diameter_px, max_diameter_px) = match samples.diameter_stats() {
        Some((mean, std)) => {
            let spread = (3.0 * std).max(mean * 0.5);
            ((mean - spread).max(2.0), (mean + spread).min(120.0))
        }
        None => (defaults.min_diameter_px, defaults.max_diameter_px),
    };

    ThresholdParams {
        threshold_offset,
        min_diameter_px,
        max_diameter_px,
    }
}
