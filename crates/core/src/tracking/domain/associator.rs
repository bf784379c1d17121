use std::collections::HashSet;
use std::time::Duration;

use super::face_tracker::FaceTracker;
use super::track::TrackId;
use super::track_registry::TrackRegistry;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

/// Outcome of reconciling one detection pass with the registry.
/// Detections are referred to by their index in the pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Association {
    /// `(detection, track)` pairs where an existing track claimed the detection.
    pub matched: Vec<(usize, TrackId)>,
    /// Tracks spawned for unmatched detections, in detection order.
    pub created: Vec<TrackId>,
    /// Detections that only fell inside tracks already claimed this pass.
    pub duplicates: Vec<usize>,
    /// Unmatched detections for which no track could be started.
    pub rejected: Vec<usize>,
}

/// Matches detections against known tracks and starts tracks for new faces.
///
/// Detections are processed in order. Each is tested against the tracks in
/// creation order with [`BoundingBox::claims`]; the first track that has not
/// already claimed a detection in this pass takes it. A track spawned
/// earlier in the same pass counts as claimed by the detection that created
/// it.
#[derive(Debug, Default)]
pub struct Associator;

impl Associator {
    pub fn new() -> Self {
        Self
    }

    pub fn associate(
        &self,
        registry: &mut TrackRegistry,
        tracker: &mut dyn FaceTracker,
        frame: &Frame,
        detections: &[BoundingBox],
        now: Duration,
    ) -> Association {
        let mut result = Association::default();
        let mut claimed: HashSet<TrackId> = HashSet::new();

        for (index, detection) in detections.iter().enumerate() {
            let mut inside_any = false;
            let mut claimer = None;
            for track in registry.iter() {
                if !track.bbox().claims(detection) {
                    continue;
                }
                inside_any = true;
                if !claimed.contains(&track.id()) {
                    claimer = Some(track.id());
                    break;
                }
            }

            if let Some(id) = claimer {
                claimed.insert(id);
                result.matched.push((index, id));
            } else if inside_any {
                log::debug!("Detection {detection:?} duplicates an already claimed track");
                result.duplicates.push(index);
            } else {
                match spawn(registry, tracker, frame, detection, now) {
                    Some(id) => {
                        claimed.insert(id);
                        result.created.push(id);
                    }
                    None => result.rejected.push(index),
                }
            }
        }

        result
    }
}

fn spawn(
    registry: &mut TrackRegistry,
    tracker: &mut dyn FaceTracker,
    frame: &Frame,
    detection: &BoundingBox,
    now: Duration,
) -> Option<TrackId> {
    let Some(crop) = frame.crop(detection) else {
        log::warn!("Detection {detection:?} lies outside the frame, ignored");
        return None;
    };
    match tracker.init(frame, *detection) {
        Ok(handle) => {
            let id = registry.create(*detection, handle, crop, now);
            log::debug!("Track {id} created at {detection:?}");
            Some(id)
        }
        Err(e) => {
            log::warn!("Tracker init failed for {detection:?}: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::domain::face_tracker::TrackerHandle;
    use crate::tracking::domain::track::test_support::{solid_frame, InertHandle};

    struct InertTracker {
        fail: bool,
        inits: usize,
    }

    impl InertTracker {
        fn new() -> Self {
            Self {
                fail: false,
                inits: 0,
            }
        }
    }

    impl FaceTracker for InertTracker {
        fn init(
            &mut self,
            _frame: &Frame,
            _bbox: BoundingBox,
        ) -> Result<Box<dyn TrackerHandle>, Box<dyn std::error::Error>> {
            self.inits += 1;
            if self.fail {
                return Err("no tracker available".into());
            }
            Ok(Box::new(InertHandle))
        }
    }

    const NOW: Duration = Duration::from_secs(5);

    fn run(
        registry: &mut TrackRegistry,
        tracker: &mut InertTracker,
        detections: &[BoundingBox],
    ) -> Association {
        let frame = solid_frame(200, 200);
        Associator::new().associate(registry, tracker, &frame, detections, NOW)
    }

    #[test]
    fn test_unmatched_detections_create_tracks() {
        let mut registry = TrackRegistry::new();
        let mut tracker = InertTracker::new();

        let result = run(
            &mut registry,
            &mut tracker,
            &[BoundingBox::new(10, 10, 30, 30), BoundingBox::new(120, 120, 30, 30)],
        );

        assert_eq!(result.created, vec![0, 1]);
        assert!(result.matched.is_empty());
        assert_eq!(registry.len(), 2);
        let first = registry.get(0).unwrap();
        assert_eq!(first.created_at(), NOW);
        assert_eq!(first.best_image().width(), 30);
        assert_eq!(first.best_image().height(), 30);
    }

    #[test]
    fn test_known_face_is_claimed_not_duplicated() {
        let mut registry = TrackRegistry::new();
        let mut tracker = InertTracker::new();
        run(&mut registry, &mut tracker, &[BoundingBox::new(50, 50, 40, 40)]);

        let result = run(&mut registry, &mut tracker, &[BoundingBox::new(55, 52, 40, 40)]);

        assert_eq!(result.matched, vec![(0, 0)]);
        assert!(result.created.is_empty());
        assert_eq!(registry.len(), 1);
        assert_eq!(tracker.inits, 1);
    }

    #[test]
    fn test_second_detection_in_same_track_is_duplicate() {
        let mut registry = TrackRegistry::new();
        let mut tracker = InertTracker::new();
        run(&mut registry, &mut tracker, &[BoundingBox::new(50, 50, 40, 40)]);

        let result = run(
            &mut registry,
            &mut tracker,
            &[BoundingBox::new(52, 52, 40, 40), BoundingBox::new(54, 54, 40, 40)],
        );

        assert_eq!(result.matched, vec![(0, 0)]);
        assert_eq!(result.duplicates, vec![1]);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_track_created_in_pass_claims_later_overlapping_detection() {
        let mut registry = TrackRegistry::new();
        let mut tracker = InertTracker::new();

        let result = run(
            &mut registry,
            &mut tracker,
            &[BoundingBox::new(50, 50, 40, 40), BoundingBox::new(53, 51, 40, 40)],
        );

        assert_eq!(result.created, vec![0]);
        assert_eq!(result.duplicates, vec![1]);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_first_unclaimed_track_wins() {
        let mut registry = TrackRegistry::new();
        let mut tracker = InertTracker::new();
        // Two stacked tracks; the second detection falls inside both.
        registry.create(
            BoundingBox::new(40, 40, 60, 60),
            Box::new(InertHandle),
            solid_frame(60, 60),
            NOW,
        );
        registry.create(
            BoundingBox::new(45, 45, 60, 60),
            Box::new(InertHandle),
            solid_frame(60, 60),
            NOW,
        );

        let result = run(
            &mut registry,
            &mut tracker,
            &[BoundingBox::new(50, 50, 20, 20), BoundingBox::new(48, 48, 20, 20)],
        );

        assert_eq!(result.matched, vec![(0, 0), (1, 1)]);
        assert!(result.created.is_empty());
    }

    #[test]
    fn test_tracker_init_failure_rejects_without_consuming_id() {
        let mut registry = TrackRegistry::new();
        let mut tracker = InertTracker::new();
        tracker.fail = true;

        let result = run(&mut registry, &mut tracker, &[BoundingBox::new(10, 10, 30, 30)]);

        assert_eq!(result.rejected, vec![0]);
        assert!(registry.is_empty());
        assert_eq!(registry.peek_next_id(), 0);
    }

    #[test]
    fn test_detection_outside_frame_rejected() {
        let mut registry = TrackRegistry::new();
        let mut tracker = InertTracker::new();

        let result = run(&mut registry, &mut tracker, &[BoundingBox::new(500, 500, 30, 30)]);

        assert_eq!(result.rejected, vec![0]);
        assert_eq!(tracker.inits, 0);
    }

    #[test]
    fn test_empty_pass_is_noop() {
        let mut registry = TrackRegistry::new();
        let mut tracker = InertTracker::new();
        assert_eq!(run(&mut registry, &mut tracker, &[]), Association::default());
    }
}
