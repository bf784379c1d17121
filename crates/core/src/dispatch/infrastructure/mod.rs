pub mod http_event_sender;
pub mod jpeg_encoder;
pub mod pooled_dispatcher;
