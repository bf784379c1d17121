pub mod associator;
pub mod dispatch_policy;
pub mod face_tracker;
pub mod track;
pub mod track_registry;
pub mod track_updater;
