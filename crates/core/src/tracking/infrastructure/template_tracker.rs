//! Luma template-matching tracker.
//!
//! Each handle keeps a fixed-size grayscale sample of the face and, on every
//! frame, searches a window around the previous box (at three scales) for
//! the position with the lowest mean absolute difference. No model needed.
use ndarray::Array2;

use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;
use crate::tracking::domain::face_tracker::{FaceTracker, TrackerHandle};

/// Template side length in samples.
const GRID: usize = 16;

/// Candidate scales; 1.0 first so ties keep the current size.
const SCALES: [f64; 3] = [1.0, 0.95, 1.05];

/// Search radius as a fraction of the box size.
const SEARCH_MARGIN: f64 = 0.5;

pub const DEFAULT_MAX_DIFFERENCE: f32 = 40.0;

const TEMPLATE_BLEND: f32 = 0.2;

pub struct TemplateTracker {
    max_difference: f32,
}

impl TemplateTracker {
    /// `max_difference` is the largest mean absolute luma difference (0-255)
    /// still accepted as the same face.
    pub fn new(max_difference: f32) -> Self {
        Self { max_difference }
    }
}

impl Default for TemplateTracker {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DIFFERENCE)
    }
}

impl FaceTracker for TemplateTracker {
    fn init(
        &mut self,
        frame: &Frame,
        bbox: BoundingBox,
    ) -> Result<Box<dyn TrackerHandle>, Box<dyn std::error::Error>> {
        if bbox.width <= 0 || bbox.height <= 0 {
            return Err(format!("cannot track an empty box {bbox:?}").into());
        }
        if bbox.clamp_to(frame.width(), frame.height()).is_none() {
            return Err(format!("box {bbox:?} lies outside the frame").into());
        }
        Ok(Box::new(TemplateHandle {
            template: sample(frame, &bbox),
            bbox,
            max_difference: self.max_difference,
        }))
    }
}

struct TemplateHandle {
    template: Array2<f32>,
    bbox: BoundingBox,
    max_difference: f32,
}

impl TrackerHandle for TemplateHandle {
    fn update(&mut self, frame: &Frame) -> Result<Option<BoundingBox>, Box<dyn std::error::Error>> {
        let BoundingBox {
            x,
            y,
            width,
            height,
        } = self.bbox;
        let margin_x = ((width as f64 * SEARCH_MARGIN) as i32).max(1);
        let margin_y = ((height as f64 * SEARCH_MARGIN) as i32).max(1);
        let step = (width.min(height) / GRID as i32).max(1) as usize;

        let mut best: Option<(f32, BoundingBox, Array2<f32>)> = None;
        for scale in SCALES {
            let w = ((width as f64 * scale).round() as i32).max(1);
            let h = ((height as f64 * scale).round() as i32).max(1);
            for dy in (-margin_y..=margin_y).step_by(step) {
                for dx in (-margin_x..=margin_x).step_by(step) {
                    let candidate =
                        BoundingBox::new(x + dx + (width - w) / 2, y + dy + (height - h) / 2, w, h);
                    if candidate.clamp_to(frame.width(), frame.height()).is_none() {
                        continue;
                    }
                    let patch = sample(frame, &candidate);
                    let diff = mean_abs_diff(&self.template, &patch);
                    if best.as_ref().map_or(true, |(d, _, _)| diff < *d) {
                        best = Some((diff, candidate, patch));
                    }
                }
            }
        }

        match best {
            Some((diff, found, patch)) if diff <= self.max_difference => {
                self.template = &self.template * (1.0 - TEMPLATE_BLEND) + &patch * TEMPLATE_BLEND;
                self.bbox = found;
                Ok(Some(found))
            }
            _ => Ok(None),
        }
    }
}

/// Samples a `GRID` x `GRID` luma patch evenly over `bbox`.
fn sample(frame: &Frame, bbox: &BoundingBox) -> Array2<f32> {
    Array2::from_shape_fn((GRID, GRID), |(row, col)| {
        let sx = bbox.x + ((col as f64 + 0.5) * bbox.width as f64 / GRID as f64) as i32;
        let sy = bbox.y + ((row as f64 + 0.5) * bbox.height as f64 / GRID as f64) as i32;
        frame.luma_at(sx, sy)
    })
}

fn mean_abs_diff(a: &Array2<f32>, b: &Array2<f32>) -> f32 {
    (a - b).mapv(f32::abs).mean().unwrap_or(f32::MAX)
}
