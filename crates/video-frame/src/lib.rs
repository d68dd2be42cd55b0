//! Video Frame Library for Gaze Metrics
//!
//! Provides the grayscale frame type consumed by the measurement pipeline
//! and the `FrameSource` boundary behind which actual capture devices live.
//! Camera drivers are external to this workspace; anything that can hand
//! over timestamped grayscale frames can drive the pipeline.

pub mod frame;
pub mod source;

pub use frame::VideoFrame;
pub use source::{FrameSource, SyntheticSource};

use thiserror::Error;

/// Frame acquisition error types
#[derive(Error, Debug)]
pub enum FrameError {
    #[error("Source disconnected: {0}")]
    Disconnected(String),

    #[error("Invalid frame geometry: {width}x{height} with {len} bytes")]
    Geometry { width: u32, height: u32, len: usize },

    #[error("Capture timeout")]
    Timeout,
}
