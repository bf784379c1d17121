use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

/// Per-object tracking state created by a [`FaceTracker`].
///
/// Owned by exactly one track and released with it.
pub trait TrackerHandle: Send {
    /// Locates the object in `frame`. `Ok(None)` means it was not found.
    fn update(&mut self, frame: &Frame) -> Result<Option<BoundingBox>, Box<dyn std::error::Error>>;
}

/// Domain interface for single-object visual tracking.
pub trait FaceTracker: Send {
    /// Starts tracking the object under `bbox` in `frame`.
    fn init(
        &mut self,
        frame: &Frame,
        bbox: BoundingBox,
    ) -> Result<Box<dyn TrackerHandle>, Box<dyn std::error::Error>>;
}
