//! Scripted synthetic tracker
//!
//! Deterministic landmark generation for tests, dry runs, and model-less
//! operation. Geometry is parameterized so eye-state and region code can be
//! driven through known EAR values.

use crate::landmarks::{indices, LandmarkSet};
use crate::{LandmarkTracker, TrackerError};
use video_frame::VideoFrame;

/// Parameterized synthetic face geometry, normalized coordinates
#[derive(Debug, Clone)]
pub struct FaceScript {
    /// Left eye aspect ratio
    pub left_ear: f32,
    /// Right eye aspect ratio
    pub right_ear: f32,
    /// Vertical position of both eye lines
    pub eye_y: f32,
    /// Horizontal center of the left eye
    pub left_eye_x: f32,
    /// Horizontal center of the right eye
    pub right_eye_x: f32,
    /// Corner-to-corner eye width
    pub eye_width: f32,
    /// Iris ring radius
    pub iris_radius: f32,
}

impl Default for FaceScript {
    fn default() -> Self {
        Self {
            left_ear: 0.30,
            right_ear: 0.30,
            eye_y: 0.40,
            left_eye_x: 0.35,
            right_eye_x: 0.65,
            eye_width: 0.10,
            iris_radius: 0.015,
        }
    }
}

impl FaceScript {
    /// Script with both eyes at the given aspect ratio
    pub fn with_ears(left_ear: f32, right_ear: f32) -> Self {
        Self {
            left_ear,
            right_ear,
            ..Default::default()
        }
    }

    /// Materialize the script into a full landmark set with iris points
    pub fn build(&self) -> LandmarkSet {
        let mut set = LandmarkSet::filled([0.5, 0.5, 0.0]);

        self.place_eye(
            &mut set,
            self.left_eye_x,
            self.left_ear,
            indices::LEFT_EYE_OUTER,
            indices::LEFT_EYE_INNER,
            [indices::LEFT_EYE_TOP_1, indices::LEFT_EYE_TOP_2],
            [indices::LEFT_EYE_BOTTOM_1, indices::LEFT_EYE_BOTTOM_2],
            &indices::LEFT_EYE_RING,
            &indices::LEFT_IRIS,
        );
        self.place_eye(
            &mut set,
            self.right_eye_x,
            self.right_ear,
            indices::RIGHT_EYE_OUTER,
            indices::RIGHT_EYE_INNER,
            [indices::RIGHT_EYE_TOP_1, indices::RIGHT_EYE_TOP_2],
            [indices::RIGHT_EYE_BOTTOM_1, indices::RIGHT_EYE_BOTTOM_2],
            &indices::RIGHT_EYE_RING,
            &indices::RIGHT_IRIS,
        );

        set
    }

    #[allow(clippy::too_many_arguments)]
    fn place_eye(
        &self,
        set: &mut LandmarkSet,
        cx: f32,
        ear: f32,
        outer: usize,
        inner: usize,
        tops: [usize; 2],
        bottoms: [usize; 2],
        ring: &[usize],
        iris: &[usize],
    ) {
        let half_w = self.eye_width / 2.0;
        // EAR = mean vertical lid distance / corner distance.
        let half_v = (ear * self.eye_width) / 2.0;
        let y = self.eye_y;

        set.set_point(outer, cx - half_w, y);
        set.set_point(inner, cx + half_w, y);
        for (i, &top) in tops.iter().enumerate() {
            let dx = if i == 0 { -0.15 } else { 0.15 } * self.eye_width;
            set.set_point(top, cx + dx, y - half_v);
        }
        for (i, &bottom) in bottoms.iter().enumerate() {
            let dx = if i == 0 { -0.15 } else { 0.15 } * self.eye_width;
            set.set_point(bottom, cx + dx, y + half_v);
        }

        // Lid contour on an ellipse so region extraction sees a closed ring.
        let ring_half_v = half_v.max(0.005);
        for (i, &idx) in ring.iter().enumerate() {
            let theta = std::f32::consts::TAU * i as f32 / ring.len() as f32;
            set.set_point(idx, cx + half_w * theta.cos(), y + ring_half_v * theta.sin());
        }

        set.set_point(iris[0], cx, y);
        for (i, &idx) in iris.iter().skip(1).enumerate() {
            let theta = std::f32::consts::TAU * i as f32 / 4.0;
            set.set_point(
                idx,
                cx + self.iris_radius * theta.cos(),
                y + self.iris_radius * theta.sin(),
            );
        }
    }
}

/// Scripted tracker replaying a fixed per-frame sequence
///
/// After the script is exhausted the final entry repeats, so steady-state
/// scenarios need only their prefix spelled out.
pub struct SyntheticTracker {
    script: Vec<Option<LandmarkSet>>,
    cursor: usize,
}

impl SyntheticTracker {
    /// Repeat one landmark set forever
    pub fn always(set: LandmarkSet) -> Self {
        Self {
            script: vec![Some(set)],
            cursor: 0,
        }
    }

    /// Replay a per-frame script; `None` entries are "no face" frames
    pub fn from_script(script: Vec<Option<LandmarkSet>>) -> Self {
        Self { script, cursor: 0 }
    }
}

impl LandmarkTracker for SyntheticTracker {
    fn id(&self) -> &'static str {
        "synthetic"
    }

    fn landmarks(&mut self, _frame: &VideoFrame) -> Result<Option<LandmarkSet>, TrackerError> {
        if self.script.is_empty() {
            return Ok(None);
        }
        let idx = self.cursor.min(self.script.len() - 1);
        if self.cursor < self.script.len() {
            self.cursor += 1;
        }
        Ok(self.script[idx].clone())
    }
}
