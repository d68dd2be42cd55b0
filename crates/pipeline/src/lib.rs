//! Gaze Measurement Pipeline
//!
//! Per-frame orchestration of the measurement chain:
//! landmarks → eye regions → pupils → eye states → safety → performance →
//! one immutable `FrameRecord`, handed to the session logger (when
//! recording) and to a single-slot latest-record cell (for display).
//!
//! The capture/processing cycle runs on its own thread and never touches
//! disk; the session logger owns all file I/O on a second thread. Lifecycle
//! control (tracking, recording, recalibration) and the read-only state
//! accessors live on the `Orchestrator`.

pub mod clock;
pub mod config;
pub mod orchestrator;
pub mod perf;
pub mod record;

pub use config::{LogConfig, PipelineConfig};
pub use orchestrator::{Orchestrator, PipelineState};
pub use perf::{PerfConfig, PerformanceMonitor, PerformanceSample};
pub use record::FrameRecord;

use landmark_tracker::TrackerError;
use session_log::SessionError;
use thiserror::Error;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Pipeline error types
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Recording session already active")]
    RecordingActive,

    #[error("Tracking is not active")]
    NotTracking,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Tracker error: {0}")]
    Tracker(#[from] TrackerError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),
}

/// Initialize logging
pub fn init_logging() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");
}
