use crate::detection::domain::face_detector::FaceDetector;
use crate::detection::domain::face_size_bounds::FaceSizeBounds;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

/// Decorator that drops detections outside the configured face size range.
pub struct SizeBoundedDetector {
    inner: Box<dyn FaceDetector>,
    bounds: FaceSizeBounds,
}

impl SizeBoundedDetector {
    pub fn new(inner: Box<dyn FaceDetector>, bounds: FaceSizeBounds) -> Self {
        Self { inner, bounds }
    }
}

impl FaceDetector for SizeBoundedDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<BoundingBox>, Box<dyn std::error::Error>> {
        let (w, h) = (frame.width(), frame.height());
        let detections = self.inner.detect(frame)?;
        let total = detections.len();
        let kept: Vec<BoundingBox> = detections
            .into_iter()
            .filter(|b| self.bounds.accepts(b, w, h))
            .collect();
        if kept.len() < total {
            log::trace!(
                "Frame {}: {} of {total} detections outside size bounds",
                frame.index(),
                total - kept.len()
            );
        }
        Ok(kept)
    }
}
