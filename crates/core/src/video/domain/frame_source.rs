use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;

/// A live or recorded stream of frames.
///
/// The loop pulls one frame at a time; `Ok(None)` marks the end of stream.
pub trait FrameSource: Send {
    fn metadata(&self) -> &VideoMetadata;

    fn next_frame(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>>;
}
