/// Properties of an opened frame source.
#[derive(Clone, Debug, PartialEq)]
pub struct VideoMetadata {
    pub width: u32,
    pub height: u32,
    /// Nominal frame rate; 0.0 when the source does not report one.
    pub fps: f64,
    pub codec: String,
    /// File path or capture device the frames come from.
    pub source: String,
}

impl VideoMetadata {
    /// Pixel size of a fraction of the frame, per axis, truncated.
    pub fn scaled_size(&self, fraction: f64) -> (i32, i32) {
        (
            (self.width as f64 * fraction) as i32,
            (self.height as f64 * fraction) as i32,
        )
    }
}
