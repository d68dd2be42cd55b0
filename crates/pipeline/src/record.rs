//! Immutable per-frame record assembly

use crate::perf::PerformanceSample;
use eye_metrics::EyeState;
use pupil_detect::PupilObservation;
use safety_monitor::SafetyState;
use serde::Serialize;
use session_log::LogRow;

/// Snapshot of everything measured on one frame
///
/// Produced exactly once per processed frame. Ownership moves from the
/// orchestrator to the logger queue and, independently, a clone into the
/// latest-record cell; nothing mutates a record after assembly.
#[derive(Debug, Clone, Serialize)]
pub struct FrameRecord {
    /// Monotonic capture timestamp, microseconds
    pub timestamp_us: u64,
    /// Active tracker backend identifier
    pub tracker_method: &'static str,
    /// Whether the landmark source reported a face
    pub face_detected: bool,
    /// Left pupil measurement, absent when not located
    pub left_pupil: Option<PupilObservation>,
    /// Right pupil measurement, absent when not located
    pub right_pupil: Option<PupilObservation>,
    /// Left eye classification
    pub left_eye: EyeState,
    /// Right eye classification
    pub right_eye: EyeState,
    /// Alarm state at capture time
    pub safety: SafetyState,
    /// Performance figures at capture time
    pub perf: PerformanceSample,
}

impl FrameRecord {
    /// Flatten into a persistable CSV row
    pub fn to_log_row(&self) -> LogRow {
        LogRow {
            timestamp_us: self.timestamp_us,
            tracker_method: self.tracker_method,
            left_pupil_x: self.left_pupil.map(|p| p.center.0),
            left_pupil_y: self.left_pupil.map(|p| p.center.1),
            right_pupil_x: self.right_pupil.map(|p| p.center.0),
            right_pupil_y: self.right_pupil.map(|p| p.center.1),
            left_pupil_diameter: self.left_pupil.map(|p| p.diameter),
            right_pupil_diameter: self.right_pupil.map(|p| p.diameter),
            left_eye_open: self.left_eye.open,
            right_eye_open: self.right_eye.open,
            face_detected: self.face_detected,
            drowsiness_score: self.safety.perclos,
            fps: self.perf.fps,
            latency_ms: self.perf.latency_ms(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_eye() -> EyeState {
        EyeState {
            open: true,
            ear: Some(0.3),
            blink_count: 0,
            blinks_per_minute: 0.0,
        }
    }

    #[test]
    fn test_missing_pupils_flatten_to_empty_fields() {
        let record = FrameRecord {
            timestamp_us: 42,
            tracker_method: "synthetic",
            face_detected: false,
            left_pupil: None,
            right_pupil: None,
            left_eye: open_eye(),
            right_eye: open_eye(),
            safety: SafetyState::default(),
            perf: PerformanceSample::default(),
        };

        let row = record.to_log_row();
        assert!(row.left_pupil_x.is_none());
        assert!(row.right_pupil_diameter.is_none());
        let line = row.to_csv();
        assert!(line.contains(",,"), "missing values must render empty");
    }

    #[test]
    fn test_flattening_preserves_measurements() {
        let record = FrameRecord {
            timestamp_us: 1000,
            tracker_method: "onnx-mesh",
            face_detected: true,
            left_pupil: Some(PupilObservation {
                center: (100.5, 60.25),
                diameter: 9.0,
            }),
            right_pupil: Some(PupilObservation {
                center: (220.0, 61.0),
                diameter: 8.5,
            }),
            left_eye: open_eye(),
            right_eye: open_eye(),
            safety: SafetyState {
                perclos: 0.25,
                ..Default::default()
            },
            perf: PerformanceSample {
                latency_us: 3000,
                fps: 99.0,
                degraded: false,
            },
        };

        let row = record.to_log_row();
        assert_eq!(row.left_pupil_x, Some(100.5));
        assert_eq!(row.right_pupil_diameter, Some(8.5));
        assert_eq!(row.drowsiness_score, 0.25);
        assert!((row.latency_ms - 3.0).abs() < 1e-3);
    }
}
