//! Pupil localization on eye crops
//!
//! Processing order per crop: skip the brow band, median smoothing,
//! local-mean binarization with the calibration offset, morphological
//! close/open, contour enumeration, plausibility filtering, and a
//! minimal-area rotated-rect ellipse fit. Contours that are too small, too
//! large, too elongated, or off-center are rejected; the largest survivor
//! wins. No survivor means no observation for that eye this frame.

use crate::{PupilObservation, ThresholdParams};
use eye_metrics::EyeRegion;
use image::GrayImage;
use imageproc::contours::{find_contours, BorderType, Contour};
use imageproc::distance_transform::Norm;
use imageproc::filter::{box_filter, median_filter};
use imageproc::geometry::min_area_rect;
use imageproc::morphology::{close, open};
use imageproc::point::Point;
use serde::{Deserialize, Serialize};
use tracing::trace;
use video_frame::VideoFrame;

/// Locator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocatorConfig {
    /// Fraction of the crop height skipped at the top (brow/shadow band)
    pub brow_margin_frac: f32,
    /// Median smoothing radius, pixels
    pub median_radius: u32,
    /// Local-mean window radius for binarization, pixels
    pub block_radius: u32,
    /// Contour area floor, fraction of the processed crop area
    pub min_area_frac: f32,
    /// Contour area ceiling, fraction of the processed crop area
    pub max_area_frac: f32,
    /// Maximum major/minor axis ratio accepted as a pupil
    pub max_aspect_ratio: f32,
    /// Accepted horizontal centroid band, fraction of the crop half-width
    pub center_band_frac: f32,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            brow_margin_frac: 0.4,
            median_radius: 2,
            block_radius: 8,
            min_area_frac: 0.01,
            max_area_frac: 0.3,
            max_aspect_ratio: 3.0,
            center_band_frac: 0.8,
        }
    }
}

/// Pupil candidate in crop-local coordinates
#[derive(Debug, Clone, Copy)]
struct Candidate {
    cx: f32,
    cy: f32,
    diameter: f32,
    area: f32,
}

/// Stateless pupil locator
pub struct PupilLocator {
    config: LocatorConfig,
}

impl PupilLocator {
    pub fn new(config: LocatorConfig) -> Self {
        Self { config }
    }

    /// Locate the pupil inside one eye region of a frame
    ///
    /// Falls back to measuring the diameter around the tracker-supplied
    /// iris center when contour selection fails but iris landmarks exist.
    pub fn locate(
        &self,
        frame: &VideoFrame,
        region: &EyeRegion,
        params: &ThresholdParams,
    ) -> Option<PupilObservation> {
        let crop = frame
            .crop(region.x, region.y, region.width, region.height)?
            .to_gray_image();

        if let Some(found) = locate_in_crop(&crop, params, &self.config) {
            let (fx, fy) = region.to_frame(found.cx, found.cy);
            return Some(PupilObservation {
                center: (fx, fy),
                diameter: found.diameter,
            });
        }

        // Hybrid path: a refined iris center plus image-measured diameter.
        let (ix, iy) = region.iris_center?;
        let (lx, ly) = region.to_local(ix, iy);
        let diameter = measure_at(&crop, params, &self.config, lx, ly)?;
        Some(PupilObservation {
            center: (ix, iy),
            diameter,
        })
    }
}

/// Locate the pupil in a standalone crop; local coordinates
pub fn locate_in_region(
    crop: &GrayImage,
    params: &ThresholdParams,
    config: &LocatorConfig,
) -> Option<PupilObservation> {
    locate_in_crop(crop, params, config).map(|c| PupilObservation {
        center: (c.cx, c.cy),
        diameter: c.diameter,
    })
}

fn locate_in_crop(
    crop: &GrayImage,
    params: &ThresholdParams,
    config: &LocatorConfig,
) -> Option<Candidate> {
    let (w, h) = crop.dimensions();
    if w < 4 || h < 4 {
        return None;
    }

    // The pupil sits in the lower part of the region; the top band is
    // brow and shadow.
    let top = ((h as f32 * config.brow_margin_frac) as u32).min(h.saturating_sub(4));
    let roi = image::imageops::crop_imm(crop, 0, top, w, h - top).to_image();

    let cleaned = segment(&roi, params, config);
    let contours = find_contours::<i32>(&cleaned);

    let roi_area = (roi.width() * roi.height()) as f32;
    let min_area = roi_area * config.min_area_frac;
    let max_area = roi_area * config.max_area_frac;

    let best = contours
        .iter()
        .filter(|c| c.border_type == BorderType::Outer)
        .filter_map(|c| evaluate_contour(c, roi.width(), params, config, min_area, max_area))
        .max_by(|a, b| a.area.total_cmp(&b.area))?;

    trace!(
        "pupil candidate at ({:.1}, {:.1}) d={:.1}",
        best.cx,
        best.cy,
        best.diameter
    );

    Some(Candidate {
        cy: best.cy + top as f32,
        ..best
    })
}

/// Smooth and binarize a crop; dark pupil pixels become foreground
fn segment(roi: &GrayImage, params: &ThresholdParams, config: &LocatorConfig) -> GrayImage {
    let smoothed = median_filter(roi, config.median_radius, config.median_radius);
    let local_mean = box_filter(&smoothed, config.block_radius, config.block_radius);

    let mut binary = GrayImage::new(roi.width(), roi.height());
    for (x, y, px) in smoothed.enumerate_pixels() {
        let mean = local_mean.get_pixel(x, y)[0] as i16;
        let value = if (px[0] as i16) < mean - params.threshold_offset {
            255
        } else {
            0
        };
        binary.put_pixel(x, y, image::Luma([value]));
    }

    let closed = close(&binary, Norm::LInf, 1);
    open(&closed, Norm::LInf, 1)
}

/// Apply the plausibility filter and fit an ellipse to a contour
fn evaluate_contour(
    contour: &Contour<i32>,
    roi_width: u32,
    params: &ThresholdParams,
    config: &LocatorConfig,
    min_area: f32,
    max_area: f32,
) -> Option<Candidate> {
    if contour.points.len() < 5 {
        return None;
    }

    let area = polygon_area(&contour.points);
    if area < min_area || area > max_area {
        return None;
    }

    let rect = min_area_rect(&contour.points);
    let e1 = edge_length(rect[0], rect[1]);
    let e2 = edge_length(rect[1], rect[2]);
    let (major, minor) = if e1 >= e2 { (e1, e2) } else { (e2, e1) };
    if minor < 1.0 || major / minor > config.max_aspect_ratio {
        return None;
    }

    let diameter = (major + minor) / 2.0;
    if diameter < params.min_diameter_px || diameter > params.max_diameter_px {
        return None;
    }

    let (cx, cy) = polygon_centroid(&contour.points, area);
    let half_w = roi_width as f32 / 2.0;
    if (cx - half_w).abs() > half_w * config.center_band_frac {
        return None;
    }

    Some(Candidate {
        cx,
        cy,
        diameter,
        area,
    })
}

/// Measure the pupil diameter around a known center (hybrid path)
///
/// Segments the whole crop and sizes the contour containing the target
/// point, or the nearest one within a small tolerance.
pub fn measure_at(
    crop: &GrayImage,
    params: &ThresholdParams,
    config: &LocatorConfig,
    x: f32,
    y: f32,
) -> Option<f32> {
    let cleaned = segment(crop, params, config);
    let contours = find_contours::<i32>(&cleaned);

    let mut nearest: Option<(f32, f32)> = None;
    for contour in contours.iter().filter(|c| c.border_type == BorderType::Outer) {
        if contour.points.len() < 5 {
            continue;
        }
        let diameter = contour_diameter(&contour.points)?;
        if diameter < params.min_diameter_px || diameter > params.max_diameter_px {
            continue;
        }
        if point_in_polygon(&contour.points, x, y) {
            return Some(diameter);
        }
        let area = polygon_area(&contour.points);
        let (cx, cy) = polygon_centroid(&contour.points, area);
        let dist = ((cx - x).powi(2) + (cy - y).powi(2)).sqrt();
        match nearest {
            Some((best, _)) if best <= dist => {}
            _ => nearest = Some((dist, diameter)),
        }
    }

    // Tolerate small offsets between landmark center and contour.
    nearest.and_then(|(dist, d)| (dist < 8.0).then_some(d))
}

fn contour_diameter(points: &[Point<i32>]) -> Option<f32> {
    if points.is_empty() {
        return None;
    }
    let rect = min_area_rect(points);
    let e1 = edge_length(rect[0], rect[1]);
    let e2 = edge_length(rect[1], rect[2]);
    Some((e1 + e2) / 2.0)
}

fn edge_length(a: Point<i32>, b: Point<i32>) -> f32 {
    let dx = (a.x - b.x) as f32;
    let dy = (a.y - b.y) as f32;
    (dx * dx + dy * dy).sqrt()
}

/// Shoelace area of a closed pixel polygon
fn polygon_area(points: &[Point<i32>]) -> f32 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut twice_area = 0i64;
    for i in 0..points.len() {
        let a = points[i];
        let b = points[(i + 1) % points.len()];
        twice_area += a.x as i64 * b.y as i64 - b.x as i64 * a.y as i64;
    }
    (twice_area.abs() as f32) / 2.0
}

/// Shoelace centroid; falls back to the vertex mean when degenerate
fn polygon_centroid(points: &[Point<i32>], area: f32) -> (f32, f32) {
    if area > 1.0 {
        let mut cx = 0.0f64;
        let mut cy = 0.0f64;
        let mut twice_area = 0.0f64;
        for i in 0..points.len() {
            let a = points[i];
            let b = points[(i + 1) % points.len()];
            let cross = a.x as f64 * b.y as f64 - b.x as f64 * a.y as f64;
            twice_area += cross;
            cx += (a.x + b.x) as f64 * cross;
            cy += (a.y + b.y) as f64 * cross;
        }
        if twice_area.abs() > f64::EPSILON {
            let factor = 1.0 / (3.0 * twice_area);
            return ((cx * factor) as f32, (cy * factor) as f32);
        }
    }

    let n = points.len() as f32;
    let sx: f32 = points.iter().map(|p| p.x as f32).sum();
    let sy: f32 = points.iter().map(|p| p.y as f32).sum();
    (sx / n, sy / n)
}

/// Ray-casting point-in-polygon test
fn point_in_polygon(points: &[Point<i32>], x: f32, y: f32) -> bool {
    let mut inside = false;
    let n = points.len();
    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = (points[i].x as f32, points[i].y as f32);
        let (xj, yj) = (points[j].x as f32, points[j].y as f32);
        if ((yi > y) != (yj > y)) && (x < (xj - xi) * (y - yi) / (yj - yi) + xi) {
            inside = !inside;
        }
        j = i;
    }
    inside
}

#[cfg(test)]
mod tests {
    use super::*;
    use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut};
    use imageproc::rect::Rect;
    use proptest::prelude::*;

    const BG: u8 = 200;
    const DARK: u8 = 30;

    fn flat_config() -> LocatorConfig {
        LocatorConfig {
            brow_margin_frac: 0.0,
            ..Default::default()
        }
    }

    fn blank(w: u32, h: u32) -> GrayImage {
        GrayImage::from_pixel(w, h, image::Luma([BG]))
    }

    #[test]
    fn test_locates_dark_disc() {
        let mut crop = blank(60, 40);
        draw_filled_circle_mut(&mut crop, (30, 24), 6, image::Luma([DARK]));

        let obs = locate_in_region(&crop, &ThresholdParams::default(), &flat_config())
            .expect("disc should be found");

        assert!((obs.center.0 - 30.0).abs() < 2.5, "cx {}", obs.center.0);
        assert!((obs.center.1 - 24.0).abs() < 2.5, "cy {}", obs.center.1);
        assert!(
            obs.diameter > 8.0 && obs.diameter < 16.0,
            "diameter {}",
            obs.diameter
        );
    }

    #[test]
    fn test_uniform_crop_yields_none() {
        let crop = blank(60, 40);
        assert!(locate_in_region(&crop, &ThresholdParams::default(), &flat_config()).is_none());
    }

    #[test]
    fn test_brow_band_excluded() {
        let mut crop = blank(60, 40);
        // Brow-like dark bar near the top, pupil lower down.
        draw_filled_rect_mut(
            &mut crop,
            Rect::at(14, 2).of_size(32, 4),
            image::Luma([DARK]),
        );
        draw_filled_circle_mut(&mut crop, (30, 28), 5, image::Luma([DARK]));

        let config = LocatorConfig {
            brow_margin_frac: 0.4,
            ..Default::default()
        };
        let obs = locate_in_region(&crop, &ThresholdParams::default(), &config)
            .expect("pupil below the brow band");
        assert!(obs.center.1 > 20.0, "picked the brow bar at y {}", obs.center.1);
    }

    #[test]
    fn test_prefers_plausible_contour_over_larger_elongated_one() {
        let mut crop = blank(64, 48);
        // Larger but far from circular.
        draw_filled_rect_mut(
            &mut crop,
            Rect::at(14, 32).of_size(36, 3),
            image::Luma([DARK]),
        );
        // Smaller but pupil-shaped.
        draw_filled_circle_mut(&mut crop, (32, 16), 4, image::Luma([DARK]));

        let obs = locate_in_region(&crop, &ThresholdParams::default(), &flat_config())
            .expect("plausible contour expected");

        assert!(
            (obs.center.1 - 16.0).abs() < 3.0,
            "selected the elongated contour at y {}",
            obs.center.1
        );
        assert!(obs.diameter < 14.0);
    }

    #[test]
    fn test_calibrated_diameter_bounds_reject_oversized_blob() {
        let mut crop = blank(64, 48);
        draw_filled_circle_mut(&mut crop, (32, 24), 10, image::Luma([DARK]));

        let params = ThresholdParams {
            max_diameter_px: 8.0,
            ..Default::default()
        };
        assert!(locate_in_region(&crop, &params, &flat_config()).is_none());
    }

    #[test]
    fn test_measure_at_known_center() {
        let mut crop = blank(60, 40);
        draw_filled_circle_mut(&mut crop, (28, 22), 6, image::Luma([DARK]));

        let d = measure_at(
            &crop,
            &ThresholdParams::default(),
            &flat_config(),
            28.0,
            22.0,
        )
        .expect("contour around the target point");
        assert!(d > 8.0 && d < 16.0, "diameter {d}");
    }

    #[test]
    fn test_measure_at_rejects_distant_contours() {
        let mut crop = blank(60, 40);
        draw_filled_circle_mut(&mut crop, (10, 10), 4, image::Luma([DARK]));

        assert!(measure_at(
            &crop,
            &ThresholdParams::default(),
            &flat_config(),
            50.0,
            35.0
        )
        .is_none());
    }

    proptest! {
        /// Valid observations always carry a finite, non-negative diameter.
        #[test]
        fn prop_diameter_nonnegative(pixels in proptest::collection::vec(0u8..=255, 24 * 16)) {
            let crop = GrayImage::from_raw(24, 16, pixels).unwrap();
            if let Some(obs) =
                locate_in_region(&crop, &ThresholdParams::default(), &flat_config())
            {
                prop_assert!(obs.diameter.is_finite());
                prop_assert!(obs.diameter >= 0.0);
            }
        }
    }
}
