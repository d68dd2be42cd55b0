//! ONNX face-mesh tracker backend

use crate::landmarks::{LandmarkSet, MESH_POINTS};
use crate::synthetic::FaceScript;
use crate::{LandmarkTracker, TrackerConfig, TrackerError};
use ndarray::Array4;
use ort::session::{builder::GraphOptimizationLevel, Session};
use tracing::{error, info, warn};
use video_frame::VideoFrame;

/// Model input edge length
const INPUT_SIZE: u32 = 192;

/// Face-mesh landmark tracker
///
/// Runs a 468-point face-mesh ONNX model when a model path is configured.
/// Without one it degrades to a fixed synthetic face so the rest of the
/// pipeline stays exercisable.
pub struct OnnxMeshTracker {
    confidence_threshold: f32,
    session: Option<Session>,
}

impl OnnxMeshTracker {
    pub fn new(config: &TrackerConfig) -> Result<Self, TrackerError> {
        let session = if let Some(path) = &config.model_path {
            info!("Loading face-mesh model from {}", path);
            match Session::builder() {
                Ok(builder) => {
                    match builder.with_optimization_level(GraphOptimizationLevel::Level3) {
                        Ok(builder) => match builder.commit_from_file(path) {
                            Ok(s) => Some(s),
                            Err(e) => {
                                error!("Failed to load face-mesh model: {}", e);
                                return Err(TrackerError::ModelLoad(e.to_string()));
                            }
                        },
                        Err(e) => {
                            error!("Failed to configure model optimization: {}", e);
                            return Err(TrackerError::ModelLoad(e.to_string()));
                        }
                    }
                }
                Err(e) => {
                    error!("Failed to create session builder: {}", e);
                    return Err(TrackerError::ModelLoad(e.to_string()));
                }
            }
        } else {
            warn!("No face-mesh model path configured. Using synthetic landmarks.");
            None
        };

        Ok(Self {
            confidence_threshold: config.confidence,
            session,
        })
    }

    /// Resize + normalize a grayscale frame into the model's NCHW tensor
    fn preprocess(&self, frame: &VideoFrame) -> Result<Array4<f32>, TrackerError> {
        let img = frame.to_gray_image();
        let resized = image::imageops::resize(
            &img,
            INPUT_SIZE,
            INPUT_SIZE,
            image::imageops::FilterType::Triangle,
        );

        // The mesh model expects three channels in [0, 1]; replicate luma.
        let mut input = Array4::<f32>::zeros((1, 3, INPUT_SIZE as usize, INPUT_SIZE as usize));
        for (x, y, pixel) in resized.enumerate_pixels() {
            let v = pixel[0] as f32 / 255.0;
            input[[0, 0, y as usize, x as usize]] = v;
            input[[0, 1, y as usize, x as usize]] = v;
            input[[0, 2, y as usize, x as usize]] = v;
        }
        Ok(input)
    }

    /// Decode a raw landmark tensor into a normalized set
    ///
    /// The model emits (x, y, z) triplets in input-pixel units.
    fn decode(&self, raw: &[f32]) -> Option<LandmarkSet> {
        if raw.len() < MESH_POINTS * 3 {
            warn!(
                "Face-mesh output too small: {} values, expected at least {}",
                raw.len(),
                MESH_POINTS * 3
            );
            return None;
        }

        let scale = INPUT_SIZE as f32;
        let points: Vec<[f32; 3]> = raw
            .chunks_exact(3)
            .map(|p| [p[0] / scale, p[1] / scale, p[2] / scale])
            .collect();

        LandmarkSet::new(points)
    }
}

impl LandmarkTracker for OnnxMeshTracker {
    fn id(&self) -> &'static str {
        "onnx-mesh"
    }

    fn landmarks(&mut self, frame: &VideoFrame) -> Result<Option<LandmarkSet>, TrackerError> {
        if let Some(session) = &self.session {
            let input = self.preprocess(frame)?;

            let outputs = session
                .run(ort::inputs![input].map_err(|e| TrackerError::Inference(e.to_string()))?)
                .map_err(|e| TrackerError::Inference(e.to_string()))?;

            // A second single-element output, when present, is the face
            // presence score.
            if outputs.len() > 1 {
                let score = outputs[1]
                    .try_extract_tensor::<f32>()
                    .map_err(|e| TrackerError::Inference(e.to_string()))?;
                if let Some(&s) = score.iter().next() {
                    if s < self.confidence_threshold {
                        return Ok(None);
                    }
                }
            }

            let tensor = outputs[0]
                .try_extract_tensor::<f32>()
                .map_err(|e| TrackerError::Inference(e.to_string()))?;
            let raw: Vec<f32> = tensor.iter().copied().collect();

            Ok(self.decode(&raw))
        } else {
            // Model-less operation: a centered synthetic face.
            Ok(Some(FaceScript::default().build()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_less_tracker_reports_face() {
        let mut tracker = OnnxMeshTracker::new(&TrackerConfig::default()).expect("no model needed");
        let frame = VideoFrame::new(vec![128; 64 * 64], 64, 64, 0, 0).unwrap();

        let set = tracker.landmarks(&frame).expect("never fails without model");
        assert!(set.is_some());
        assert_eq!(tracker.id(), "onnx-mesh");
    }
}
