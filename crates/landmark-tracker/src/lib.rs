//! Landmark Tracker
//!
//! Facial landmark detection backends behind one interface:
//! - ONNX face-mesh model (468-point scheme, iris refinement)
//! - Synthetic scripted tracker for tests and model-less operation
//!
//! A tracker reports landmarks-or-absent per frame. Absence of a face is an
//! ordinary outcome, never an error.

pub mod landmarks;
pub mod mesh;
pub mod synthetic;

pub use landmarks::{indices, LandmarkSet, SCHEME_VERSION};
pub use mesh::OnnxMeshTracker;
pub use synthetic::{FaceScript, SyntheticTracker};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use video_frame::VideoFrame;

/// Tracker error types
#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("Model loading failed: {0}")]
    ModelLoad(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Image processing failed: {0}")]
    ImageProcessing(String),

    #[error("Unknown tracker kind: {0}")]
    UnknownKind(String),
}

/// Landmark source interface
///
/// One method, one contract: a `LandmarkSet` when a face is present,
/// `None` when it is not. Implementations must not fail on ordinary
/// face absence.
pub trait LandmarkTracker: Send {
    /// Stable identifier of this backend, recorded in session logs
    fn id(&self) -> &'static str;

    /// Detect facial landmarks in a frame
    fn landmarks(&mut self, frame: &VideoFrame) -> Result<Option<LandmarkSet>, TrackerError>;
}

/// Tracker backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrackerKind {
    /// ONNX face-mesh model
    OnnxMesh,
    /// Scripted synthetic landmarks
    Synthetic,
}

/// Tracker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Backend to instantiate
    pub kind: TrackerKind,

    /// Path to the face-mesh ONNX model (OnnxMesh only)
    pub model_path: Option<String>,

    /// Minimum face presence score accepted from the model
    pub confidence: f32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            kind: TrackerKind::OnnxMesh,
            model_path: None,
            confidence: 0.5,
        }
    }
}

/// Instantiate the backend selected by configuration
pub fn create_tracker(config: &TrackerConfig) -> Result<Box<dyn LandmarkTracker>, TrackerError> {
    match config.kind {
        TrackerKind::OnnxMesh => Ok(Box::new(OnnxMeshTracker::new(config)?)),
        TrackerKind::Synthetic => Ok(Box::new(SyntheticTracker::always(
            synthetic::FaceScript::default().build(),
        ))),
    }
}
