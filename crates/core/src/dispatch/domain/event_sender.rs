use super::dispatch_error::DispatchError;
use super::sighting_event::SightingEvent;

/// Delivers one sighting to the collector.
///
/// Called concurrently from dispatch workers. Returns the HTTP status on
/// success (any 2xx).
pub trait EventSender: Send + Sync {
    fn send(&self, event: &SightingEvent) -> Result<u16, DispatchError>;
}
