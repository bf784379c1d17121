use std::time::Duration;

use super::track::{Track, TrackId};
use super::track_registry::TrackRegistry;
use crate::shared::frame::Frame;

/// Advances every active track by one frame.
///
/// A track whose tracker locates the face takes the new box and may
/// upgrade its best image. A track that has not been located for at least
/// `failure_delay` is removed and returned to the caller.
#[derive(Clone, Copy, Debug)]
pub struct TrackUpdater {
    failure_delay: Duration,
}

impl TrackUpdater {
    pub fn new(failure_delay: Duration) -> Self {
        Self { failure_delay }
    }

    pub fn failure_delay(&self) -> Duration {
        self.failure_delay
    }

    /// Returns the tracks that expired on this frame, in creation order.
    pub fn advance(&self, registry: &mut TrackRegistry, frame: &Frame, now: Duration) -> Vec<Track> {
        let mut expired: Vec<TrackId> = Vec::new();

        for track in registry.iter_mut() {
            let located = match track.locate(frame) {
                Ok(found) => found,
                Err(e) => {
                    log::warn!("Tracker for track {} failed: {e}", track.id());
                    None
                }
            };

            match located {
                Some(bbox) => {
                    track.mark_located(bbox, now);
                    if track.offer_crop(frame) {
                        log::trace!(
                            "Track {} best image upgraded to {}x{}",
                            track.id(),
                            bbox.width,
                            bbox.height
                        );
                    }
                }
                None => {
                    if now.saturating_sub(track.last_detected_at()) >= self.failure_delay {
                        expired.push(track.id());
                    } else {
                        track.mark_lost(now);
                    }
                }
            }
        }

        expired
            .into_iter()
            .filter_map(|id| registry.remove(id))
            .inspect(|t| log::debug!("Track {} expired after {:?} visible", t.id(), t.visible_for()))
            .collect()
    }
}
