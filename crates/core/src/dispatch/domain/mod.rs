pub mod dispatch_error;
pub mod dispatcher;
pub mod event_sender;
pub mod sighting_event;
