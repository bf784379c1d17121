use std::time::Duration;

use crate::shared::frame::Frame;
use crate::tracking::domain::track::{Track, TrackId};

/// A confirmed face sighting, ready to be reported to the collector.
#[derive(Clone, Debug, PartialEq)]
pub struct SightingEvent {
    pub track_id: TrackId,
    pub node_id: u64,
    /// When the face was first seen, as time since the Unix epoch.
    pub created_at: Duration,
    /// Best crop of the face; owned by the event.
    pub image: Frame,
}

impl SightingEvent {
    /// Consumes an expired track. The best image moves into the event.
    pub fn from_track(track: Track, node_id: u64) -> Self {
        let track_id = track.id();
        let created_at = track.created_at();
        Self {
            track_id,
            node_id,
            created_at,
            image: track.into_best_image(),
        }
    }

    /// Whole seconds since the Unix epoch at track creation.
    pub fn event_time_secs(&self) -> u64 {
        self.created_at.as_secs()
    }
}
