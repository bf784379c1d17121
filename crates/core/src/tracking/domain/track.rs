use std::fmt;
use std::time::Duration;

use super::face_tracker::TrackerHandle;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

pub type TrackId = u64;

/// Whether the tracker located the face on the most recent frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrackStatus {
    Locating,
    /// Tracker has failed on every frame since `since`.
    Lost { since: Duration },
}

/// One continuously observed face.
pub struct Track {
    id: TrackId,
    bbox: BoundingBox,
    created_at: Duration,
    last_detected_at: Duration,
    best_image: Frame,
    handle: Box<dyn TrackerHandle>,
    status: TrackStatus,
}

/// Read-only snapshot of a track for presentation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrackView {
    pub id: TrackId,
    pub bbox: BoundingBox,
    pub status: TrackStatus,
    /// Set on the final view of an expired track once its sighting was
    /// accepted by the dispatcher. Always false for active tracks.
    pub dispatched: bool,
}

impl Track {
    pub(crate) fn new(
        id: TrackId,
        bbox: BoundingBox,
        handle: Box<dyn TrackerHandle>,
        best_image: Frame,
        now: Duration,
    ) -> Self {
        Self {
            id,
            bbox,
            created_at: now,
            last_detected_at: now,
            best_image,
            handle,
            status: TrackStatus::Locating,
        }
    }

    pub fn id(&self) -> TrackId {
        self.id
    }

    pub fn bbox(&self) -> BoundingBox {
        self.bbox
    }

    pub fn created_at(&self) -> Duration {
        self.created_at
    }

    pub fn last_detected_at(&self) -> Duration {
        self.last_detected_at
    }

    pub fn best_image(&self) -> &Frame {
        &self.best_image
    }

    pub fn status(&self) -> TrackStatus {
        self.status
    }

    /// Time between creation and the last successful location.
    pub fn visible_for(&self) -> Duration {
        self.last_detected_at.saturating_sub(self.created_at)
    }

    pub fn view(&self) -> TrackView {
        TrackView {
            id: self.id,
            bbox: self.bbox,
            status: self.status,
            dispatched: false,
        }
    }

    pub(crate) fn locate(
        &mut self,
        frame: &Frame,
    ) -> Result<Option<BoundingBox>, Box<dyn std::error::Error>> {
        self.handle.update(frame)
    }

    pub(crate) fn mark_located(&mut self, bbox: BoundingBox, now: Duration) {
        self.bbox = bbox;
        self.last_detected_at = now;
        self.status = TrackStatus::Locating;
    }

    pub(crate) fn mark_lost(&mut self, now: Duration) {
        if self.status == TrackStatus::Locating {
            self.status = TrackStatus::Lost { since: now };
        }
    }

    /// Replaces the best image with the crop under the current box when that
    /// box is strictly larger on both axes and clear of the frame border.
    ///
    /// Returns whether the image was replaced.
    pub(crate) fn offer_crop(&mut self, frame: &Frame) -> bool {
        if !self
            .bbox
            .exceeds(self.best_image.width(), self.best_image.height())
        {
            return false;
        }
        if self.bbox.touches_border(frame.width(), frame.height()) {
            return false;
        }
        match frame.crop(&self.bbox) {
            Some(crop) => {
                self.best_image = crop;
                true
            }
            None => false,
        }
    }

    /// Consumes the track, releasing its tracker handle.
    pub(crate) fn into_best_image(self) -> Frame {
        self.best_image
    }
}

impl fmt::Debug for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Track")
            .field("id", &self.id)
            .field("bbox", &self.bbox)
            .field("created_at", &self.created_at)
            .field("last_detected_at", &self.last_detected_at)
            .field(
                "best_image",
                &(self.best_image.width(), self.best_image.height()),
            )
            .field("status", &self.status)
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Handle that never locates anything; tracks built with it are driven
    /// through the `mark_*` methods directly.
    pub struct InertHandle;

    impl TrackerHandle for InertHandle {
        fn update(
            &mut self,
            _frame: &Frame,
        ) -> Result<Option<BoundingBox>, Box<dyn std::error::Error>> {
            Ok(None)
        }
    }

    pub fn solid_frame(width: u32, height: u32) -> Frame {
        Frame::new(vec![90u8; (width * height * 3) as usize], width, height, 3, 0)
    }

    pub fn track(id: TrackId, bbox: BoundingBox, best: (u32, u32), now: Duration) -> Track {
        Track::new(
            id,
            bbox,
            Box::new(InertHandle),
            solid_frame(best.0, best.1),
            now,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    const T0: Duration = Duration::from_secs(100);

    #[test]
    fn test_new_track_is_locating() {
        let t = track(3, BoundingBox::new(10, 10, 20, 20), (20, 20), T0);
        assert_eq!(t.id(), 3);
        assert_eq!(t.created_at(), T0);
        assert_eq!(t.last_detected_at(), T0);
        assert_eq!(t.status(), TrackStatus::Locating);
        assert!(!t.view().dispatched);
        assert_eq!(t.visible_for(), Duration::ZERO);
    }

    #[test]
    fn test_lost_since_is_first_failure() {
        let mut t = track(0, BoundingBox::new(10, 10, 20, 20), (20, 20), T0);
        t.mark_lost(T0 + Duration::from_millis(100));
        t.mark_lost(T0 + Duration::from_millis(200));
        assert_eq!(
            t.status(),
            TrackStatus::Lost {
                since: T0 + Duration::from_millis(100)
            }
        );

        t.mark_located(BoundingBox::new(12, 10, 20, 20), T0 + Duration::from_millis(300));
        assert_eq!(t.status(), TrackStatus::Locating);
        assert_eq!(t.visible_for(), Duration::from_millis(300));
    }

    #[test]
    fn test_offer_crop_accepts_strictly_larger_interior_box() {
        let frame = solid_frame(100, 100);
        let mut t = track(0, BoundingBox::new(10, 10, 30, 30), (20, 20), T0);

        assert!(t.offer_crop(&frame));
        assert_eq!(t.best_image().width(), 30);
        assert_eq!(t.best_image().height(), 30);
    }

    #[test]
    fn test_offer_crop_rejects_when_one_axis_not_larger() {
        let frame = solid_frame(100, 100);
        let mut t = track(0, BoundingBox::new(10, 10, 30, 20), (20, 20), T0);

        assert!(!t.offer_crop(&frame));
        assert_eq!(t.best_image().width(), 20);
    }

    #[test]
    fn test_offer_crop_rejects_border_box() {
        let frame = solid_frame(100, 100);
        let mut t = track(0, BoundingBox::new(0, 10, 40, 40), (20, 20), T0);

        assert!(!t.offer_crop(&frame));
        assert_eq!(t.best_image().width(), 20);
    }

    #[test]
    fn test_debug_omits_pixels() {
        let t = track(5, BoundingBox::new(1, 1, 2, 2), (4, 3), T0);
        let text = format!("{t:?}");
        assert!(text.contains("id: 5"));
        assert!(text.contains("best_image: (4, 3)"));
    }
}
