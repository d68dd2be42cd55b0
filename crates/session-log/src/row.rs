//! CSV row formatting

use serde::Serialize;

/// One logged frame, already flattened for persistence
#[derive(Debug, Clone, Serialize)]
pub struct LogRow {
    /// Monotonic capture timestamp, microseconds
    pub timestamp_us: u64,
    /// Identifier of the active tracker backend
    pub tracker_method: &'static str,
    pub left_pupil_x: Option<f32>,
    pub left_pupil_y: Option<f32>,
    pub right_pupil_x: Option<f32>,
    pub right_pupil_y: Option<f32>,
    pub left_pupil_diameter: Option<f32>,
    pub right_pupil_diameter: Option<f32>,
    /// Left eye open=true/closed=false
    pub left_eye_open: bool,
    /// Right eye open=true/closed=false
    pub right_eye_open: bool,
    pub face_detected: bool,
    /// PERCLOS at capture time
    pub drowsiness_score: f32,
    /// Smoothed pipeline frame rate at capture time
    pub fps: f32,
    /// This frame's processing latency, milliseconds
    pub latency_ms: f32,
}

impl LogRow {
    /// CSV header line, matching `to_csv` field order
    pub const HEADER: &'static str = "timestamp_us,tracker_method,left_pupil_x,left_pupil_y,\
right_pupil_x,right_pupil_y,left_pupil_diameter,right_pupil_diameter,\
left_eye_state,right_eye_state,face_detected,drowsiness_score,fps,latency_ms";

    /// Render the row as one CSV line (no trailing newline)
    pub fn to_csv(&self) -> String {
        format!(
            "{},{},{},{},{},{},{},{},{},{},{},{:.4},{:.2},{:.3}",
            self.timestamp_us,
            self.tracker_method,
            fmt_opt(self.left_pupil_x),
            fmt_opt(self.left_pupil_y),
            fmt_opt(self.right_pupil_x),
            fmt_opt(self.right_pupil_y),
            fmt_opt(self.left_pupil_diameter),
            fmt_opt(self.right_pupil_diameter),
            self.left_eye_open as u8,
            self.right_eye_open as u8,
            self.face_detected as u8,
            self.drowsiness_score,
            self.fps,
            self.latency_ms,
        )
    }
}

/// Missing values render as empty fields
fn fmt_opt(value: Option<f32>) -> String {
    match value {
        Some(v) => format!("{v:.2}"),
        None => String::new(),
    }
}
