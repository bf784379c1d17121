use crate::shared::bounding_box::BoundingBox;

/// Accepted face size range, as fractions of the frame dimensions.
///
/// A frame of `W` x `H` accepts boxes from `(W * min, H * min)` up to
/// `(W * max, H * max)` inclusive, with both limits truncated to whole pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FaceSizeBounds {
    min_fraction: f64,
    max_fraction: f64,
}

impl FaceSizeBounds {
    pub fn new(min_fraction: f64, max_fraction: f64) -> Self {
        Self {
            min_fraction,
            max_fraction,
        }
    }

    /// `((min_w, min_h), (max_w, max_h))` in pixels for a given frame size.
    pub fn pixel_bounds(&self, frame_width: u32, frame_height: u32) -> ((i32, i32), (i32, i32)) {
        let scale = |fraction: f64| {
            (
                (frame_width as f64 * fraction) as i32,
                (frame_height as f64 * fraction) as i32,
            )
        };
        (scale(self.min_fraction), scale(self.max_fraction))
    }

    pub fn accepts(&self, bbox: &BoundingBox, frame_width: u32, frame_height: u32) -> bool {
        let ((min_w, min_h), (max_w, max_h)) = self.pixel_bounds(frame_width, frame_height);
        (min_w..=max_w).contains(&bbox.width) && (min_h..=max_h).contains(&bbox.height)
    }
}
