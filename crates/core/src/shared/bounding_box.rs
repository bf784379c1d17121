/// Axis-aligned face box in frame pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// Distance from the frame edge, in pixels, within which a box counts as
/// touching the border.
pub const BORDER_MARGIN: i32 = 1;

impl BoundingBox {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Builds a box from `[x1, y1, x2, y2]` corners, truncating like the
    /// vision backends do when they hand out integer boxes.
    pub fn from_corners(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self {
            x: x1 as i32,
            y: y1 as i32,
            width: (x2 - x1) as i32,
            height: (y2 - y1) as i32,
        }
    }

    pub fn center(&self) -> (f64, f64) {
        (
            self.x as f64 + self.width as f64 / 2.0,
            self.y as f64 + self.height as f64 / 2.0,
        )
    }

    /// Whether a fresh `detection` belongs to the face this box tracks.
    ///
    /// The detection's center must fall inside this box, except that the
    /// horizontal extent is measured with the detection's width rather than
    /// this box's own width.
    pub fn claims(&self, detection: &BoundingBox) -> bool {
        let (cx, cy) = detection.center();
        let left = self.x as f64;
        let top = self.y as f64;
        left <= cx
            && cx <= left + detection.width as f64
            && top <= cy
            && cy <= top + self.height as f64
    }

    /// True when any side lies within [`BORDER_MARGIN`] of the frame edge
    /// (or beyond it).
    pub fn touches_border(&self, frame_width: u32, frame_height: u32) -> bool {
        let fw = frame_width as i32;
        let fh = frame_height as i32;
        self.x < BORDER_MARGIN
            || self.y < BORDER_MARGIN
            || self.x + self.width > fw - BORDER_MARGIN
            || self.y + self.height > fh - BORDER_MARGIN
    }

    /// Intersection with the frame rectangle, or `None` if it is empty.
    pub fn clamp_to(&self, frame_width: u32, frame_height: u32) -> Option<BoundingBox> {
        let fw = frame_width as i32;
        let fh = frame_height as i32;
        let x1 = self.x.clamp(0, fw);
        let y1 = self.y.clamp(0, fh);
        let x2 = (self.x + self.width).min(fw);
        let y2 = (self.y + self.height).min(fh);
        if x2 <= x1 || y2 <= y1 {
            return None;
        }
        Some(BoundingBox::new(x1, y1, x2 - x1, y2 - y1))
    }

    /// Strictly larger than `width` x `height` on both axes.
    pub fn exceeds(&self, width: u32, height: u32) -> bool {
        self.width > width as i32 && self.height > height as i32
    }
}
