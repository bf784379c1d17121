pub mod detection;
pub mod dispatch;
pub mod pipeline;
pub mod shared;
pub mod tracking;
pub mod video;
