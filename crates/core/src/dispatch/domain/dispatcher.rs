use crossbeam_channel::{Receiver, TryRecvError};

use super::dispatch_error::DispatchError;
use super::sighting_event::SightingEvent;
use crate::tracking::domain::track::TrackId;

/// Final result of one submitted event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    Delivered { status: u16 },
    Failed(String),
}

/// Completion handle returned by [`Dispatcher::submit`].
///
/// Dropping it does not cancel the delivery.
#[derive(Debug)]
pub struct DispatchHandle {
    track_id: TrackId,
    outcome_rx: Receiver<DispatchOutcome>,
}

impl DispatchHandle {
    pub fn new(track_id: TrackId, outcome_rx: Receiver<DispatchOutcome>) -> Self {
        Self {
            track_id,
            outcome_rx,
        }
    }

    pub fn track_id(&self) -> TrackId {
        self.track_id
    }

    /// Blocks until the delivery finishes.
    pub fn wait(self) -> DispatchOutcome {
        self.outcome_rx
            .recv()
            .unwrap_or_else(|_| DispatchOutcome::Failed("dispatcher stopped before delivery".into()))
    }

    /// Returns the outcome if the delivery has finished.
    pub fn try_outcome(&self) -> Option<DispatchOutcome> {
        match self.outcome_rx.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(DispatchOutcome::Failed(
                "dispatcher stopped before delivery".into(),
            )),
        }
    }
}

/// Hands sighting events to background delivery.
///
/// `submit` never blocks on the network. `shutdown` waits for every accepted
/// event to finish; submissions after it fail with [`DispatchError::ShutDown`].
pub trait Dispatcher: Send {
    fn submit(&mut self, event: SightingEvent) -> Result<DispatchHandle, DispatchError>;

    fn shutdown(&mut self);
}
