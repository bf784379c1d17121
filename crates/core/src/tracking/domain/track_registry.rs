use std::time::Duration;

use super::face_tracker::TrackerHandle;
use super::track::{Track, TrackId, TrackView};
use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

/// Owns the active tracks and hands out identifiers.
///
/// Identifiers start at 0 and increase by one per created track; they are
/// never reused, even after the track is removed. Tracks are kept in
/// creation order.
#[derive(Debug, Default)]
pub struct TrackRegistry {
    tracks: Vec<Track>,
    next_id: TrackId,
}

impl TrackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(
        &mut self,
        bbox: BoundingBox,
        handle: Box<dyn TrackerHandle>,
        best_image: Frame,
        now: Duration,
    ) -> TrackId {
        let id = self.next_id;
        self.next_id += 1;
        self.tracks.push(Track::new(id, bbox, handle, best_image, now));
        id
    }

    pub fn remove(&mut self, id: TrackId) -> Option<Track> {
        let pos = self.tracks.iter().position(|t| t.id() == id)?;
        Some(self.tracks.remove(pos))
    }

    /// Removes every track, in creation order.
    pub fn drain(&mut self) -> Vec<Track> {
        std::mem::take(&mut self.tracks)
    }

    pub fn get(&self, id: TrackId) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id() == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Track> {
        self.tracks.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Track> {
        self.tracks.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// The identifier the next created track will receive.
    pub fn peek_next_id(&self) -> TrackId {
        self.next_id
    }

    pub fn views(&self) -> Vec<TrackView> {
        self.tracks.iter().map(Track::view).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::domain::track::test_support::{solid_frame, InertHandle};

    fn create(registry: &mut TrackRegistry, x: i32) -> TrackId {
        registry.create(
            BoundingBox::new(x, 0, 10, 10),
            Box::new(InertHandle),
            solid_frame(10, 10),
            Duration::ZERO,
        )
    }

    #[test]
    fn test_ids_start_at_zero_and_increase() {
        let mut registry = TrackRegistry::new();
        assert_eq!(create(&mut registry, 0), 0);
        assert_eq!(create(&mut registry, 20), 1);
        assert_eq!(create(&mut registry, 40), 2);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_ids_not_reused_after_removal() {
        let mut registry = TrackRegistry::new();
        let a = create(&mut registry, 0);
        let b = create(&mut registry, 20);
        registry.remove(a).unwrap();
        registry.remove(b).unwrap();
        assert!(registry.is_empty());

        assert_eq!(create(&mut registry, 0), 2);
    }

    #[test]
    fn test_remove_unknown_is_none() {
        let mut registry = TrackRegistry::new();
        create(&mut registry, 0);
        assert!(registry.remove(99).is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_remove_preserves_creation_order() {
        let mut registry = TrackRegistry::new();
        for x in [0, 20, 40, 60] {
            create(&mut registry, x);
        }
        registry.remove(1);
        let ids: Vec<TrackId> = registry.iter().map(Track::id).collect();
        assert_eq!(ids, vec![0, 2, 3]);
    }

    #[test]
    fn test_drain_empties_registry_but_keeps_counter() {
        let mut registry = TrackRegistry::new();
        create(&mut registry, 0);
        create(&mut registry, 20);

        let drained = registry.drain();
        assert_eq!(drained.len(), 2);
        assert!(registry.is_empty());
        assert_eq!(registry.peek_next_id(), 2);
    }

    #[test]
    fn test_views_reflect_tracks() {
        let mut registry = TrackRegistry::new();
        let id = create(&mut registry, 30);
        let views = registry.views();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].id, id);
        assert_eq!(views[0].bbox, BoundingBox::new(30, 0, 10, 10));
        assert!(registry.get(id).is_some());
    }
}
