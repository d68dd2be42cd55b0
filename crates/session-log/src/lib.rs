//! Session Log
//!
//! Thread-safe, non-blocking persistence of per-frame records to CSV.
//!
//! The capture cycle hands rows to a bounded, ordered queue; a dedicated
//! writer thread owns the file handle exclusively and drains the queue in
//! arrival order. A full queue briefly blocks the producer rather than
//! dropping rows: record-per-frame completeness is the contract, and the
//! stall is bounded by the writer's drain rate. Closing a session drains
//! the queue fully before the file handle is released, so the file holds
//! exactly the rows accepted before the close.
//!
//! CSV schema, one row per processed frame:
//! `timestamp_us,tracker_method,left_pupil_x,left_pupil_y,right_pupil_x,
//! right_pupil_y,left_pupil_diameter,right_pupil_diameter,left_eye_state,
//! right_eye_state,face_detected,drowsiness_score,fps,latency_ms`
//!
//! Eye states are per-eye columns, open=1/closed=0; `face_detected` is
//! 1/0. Missing pupil values are empty fields, never numeric placeholders.

pub mod row;
pub mod session;

pub use row::LogRow;
pub use session::{Session, SessionSummary};

use thiserror::Error;

/// Session logging error types
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Failed to create session file: {0}")]
    Create(String),

    #[error("Log write failed: {0}")]
    Io(String),

    #[error("Session writer terminated")]
    WriterClosed,
}
