//! Aggregated pipeline configuration

use crate::perf::PerfConfig;
use crate::PipelineError;
use eye_metrics::{EyeStateConfig, RegionConfig};
use landmark_tracker::TrackerConfig;
use pupil_detect::{CalibrationConfig, LocatorConfig};
use safety_monitor::SafetyConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Session logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Directory session files are created in
    pub log_dir: PathBuf,
    /// Bounded logger queue capacity, records
    pub queue_capacity: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("logs"),
            queue_capacity: 256,
        }
    }
}

/// Every tunable of the measurement pipeline in one place
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub tracker: TrackerConfig,
    pub region: RegionConfig,
    pub locator: LocatorConfig,
    pub calibration: CalibrationConfig,
    pub eye_state: EyeStateConfig,
    pub safety: SafetyConfig,
    pub perf: PerfConfig,
    pub log: LogConfig,
}

impl PipelineConfig {
    /// Load configuration from a file, with `GAZE_`-prefixed environment
    /// overrides layered on top
    pub fn from_file(path: &Path) -> Result<Self, PipelineError> {
        config::Config::builder()
            .add_source(config::File::from(path))
            .add_source(config::Environment::with_prefix("GAZE").separator("__"))
            .build()
            .map_err(|e| PipelineError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| PipelineError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        let config = PipelineConfig::default();
        assert_eq!(config.eye_state.ear_threshold, 0.22);
        assert_eq!(config.calibration.calibration_frames, 20);
        assert_eq!(config.safety.out_of_frame_grace_frames, 5);
        assert_eq!(config.perf.target_frame_rate_hz, 100.0);
        assert_eq!(config.perf.min_frame_rate_hz, 50.0);
    }

    #[test]
    fn test_from_file_layers_over_defaults() {
        let dir = std::env::temp_dir().join(format!("pipeline-config-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("pipeline.toml");
        std::fs::write(
            &path,
            "[eye_state]\near_threshold = 0.25\n\n[safety]\nperclos_window_seconds = 30.0\n",
        )
        .unwrap();

        let config = PipelineConfig::from_file(&path).unwrap();
        assert_eq!(config.eye_state.ear_threshold, 0.25);
        assert_eq!(config.safety.perclos_window_seconds, 30.0);
        // Untouched sections keep their defaults.
        assert_eq!(config.calibration.calibration_frames, 20);

        std::fs::remove_dir_all(&dir).ok();
    }
}
