use std::time::Duration;

use super::track::Track;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    Dispatch,
    Drop,
}

/// Decides whether an expired track was a real sighting.
///
/// A track qualifies when it was located for longer than `send_delay`
/// after creation *and* more than `send_delay` has elapsed since creation.
/// Both checks saturate at zero, so a `now` earlier than creation never
/// qualifies.
#[derive(Clone, Copy, Debug)]
pub struct DispatchPolicy {
    send_delay: Duration,
}

impl DispatchPolicy {
    pub fn new(send_delay: Duration) -> Self {
        Self { send_delay }
    }

    pub fn send_delay(&self) -> Duration {
        self.send_delay
    }

    pub fn evaluate(&self, track: &Track, now: Duration) -> Verdict {
        if self.qualifies(track.created_at(), track.last_detected_at(), now) {
            Verdict::Dispatch
        } else {
            Verdict::Drop
        }
    }

    pub fn qualifies(&self, created_at: Duration, last_detected_at: Duration, now: Duration) -> bool {
        last_detected_at.saturating_sub(created_at) > self.send_delay
            && now.saturating_sub(created_at) > self.send_delay
    }
}
