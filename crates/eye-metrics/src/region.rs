//! Eye region extraction from facial landmarks

use crate::EyeSide;
use landmark_tracker::{indices, LandmarkSet};
use serde::{Deserialize, Serialize};

/// Region extraction configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionConfig {
    /// Padding added around the lid contour bounding box, pixels
    pub margin_px: u32,
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self { margin_px: 5 }
    }
}

/// Crop rectangle plus the lid reference points for one eye
///
/// Coordinates are frame pixels; the rectangle is already clipped to frame
/// bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EyeRegion {
    pub side: EyeSide,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    /// Outer eye corner
    pub outer_corner: (f32, f32),
    /// Inner eye corner
    pub inner_corner: (f32, f32),
    /// Upper lid midpoint
    pub upper_lid: (f32, f32),
    /// Lower lid midpoint
    pub lower_lid: (f32, f32),
    /// Iris ring centroid, when the landmark set refines one
    pub iris_center: Option<(f32, f32)>,
}

impl EyeRegion {
    /// Map a frame coordinate into crop-local coordinates
    pub fn to_local(&self, x: f32, y: f32) -> (f32, f32) {
        (x - self.x as f32, y - self.y as f32)
    }

    /// Map a crop-local coordinate back into frame coordinates
    pub fn to_frame(&self, x: f32, y: f32) -> (f32, f32) {
        (x + self.x as f32, y + self.y as f32)
    }
}

/// Both eyes' regions for one frame; either may be absent when degenerate
#[derive(Debug, Clone, Default)]
pub struct EyeRegions {
    pub left: Option<EyeRegion>,
    pub right: Option<EyeRegion>,
}

/// Derive both eye regions from a landmark set
pub fn extract_regions(
    set: &LandmarkSet,
    frame_width: u32,
    frame_height: u32,
    config: &RegionConfig,
) -> EyeRegions {
    EyeRegions {
        left: extract_one(set, EyeSide::Left, frame_width, frame_height, config),
        right: extract_one(set, EyeSide::Right, frame_width, frame_height, config),
    }
}

fn extract_one(
    set: &LandmarkSet,
    side: EyeSide,
    frame_width: u32,
    frame_height: u32,
    config: &RegionConfig,
) -> Option<EyeRegion> {
    let (ring, outer, inner, top, bottom, iris): (&[usize], _, _, _, _, &[usize]) = match side {
        EyeSide::Left => (
            &indices::LEFT_EYE_RING,
            indices::LEFT_EYE_OUTER,
            indices::LEFT_EYE_INNER,
            indices::LEFT_EYE_TOP_1,
            indices::LEFT_EYE_BOTTOM_1,
            &indices::LEFT_IRIS,
        ),
        EyeSide::Right => (
            &indices::RIGHT_EYE_RING,
            indices::RIGHT_EYE_OUTER,
            indices::RIGHT_EYE_INNER,
            indices::RIGHT_EYE_TOP_1,
            indices::RIGHT_EYE_BOTTOM_1,
            &indices::RIGHT_IRIS,
        ),
    };

    let mut min_x = f32::MAX;
    let mut min_y = f32::MAX;
    let mut max_x = f32::MIN;
    let mut max_y = f32::MIN;
    for &idx in ring {
        let (x, y) = set.pixel(idx, frame_width, frame_height)?;
        min_x = min_x.min(x);
        min_y = min_y.min(y);
        max_x = max_x.max(x);
        max_y = max_y.max(y);
    }

    let margin = config.margin_px as f32;
    let x0 = (min_x - margin).floor().max(0.0) as u32;
    let y0 = (min_y - margin).floor().max(0.0) as u32;
    let x1 = ((max_x + margin).ceil() as u32).min(frame_width);
    let y1 = ((max_y + margin).ceil() as u32).min(frame_height);

    if x1 <= x0 || y1 <= y0 {
        return None;
    }

    Some(EyeRegion {
        side,
        x: x0,
        y: y0,
        width: x1 - x0,
        height: y1 - y0,
        outer_corner: set.pixel(outer, frame_width, frame_height)?,
        inner_corner: set.pixel(inner, frame_width, frame_height)?,
        upper_lid: set.pixel(top, frame_width, frame_height)?,
        lower_lid: set.pixel(bottom, frame_width, frame_height)?,
        iris_center: set
            .iris_center(iris)
            .map(|(x, y)| (x * frame_width as f32, y * frame_height as f32)),
    })
}
