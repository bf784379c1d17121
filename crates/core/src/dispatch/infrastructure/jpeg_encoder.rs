use std::io::Cursor;

use crate::dispatch::domain::dispatch_error::DispatchError;
use crate::shared::frame::Frame;

/// Encodes an RGB or grayscale frame as a baseline JPEG.
pub fn encode_jpeg(frame: &Frame) -> Result<Vec<u8>, DispatchError> {
    let (w, h) = (frame.width(), frame.height());
    let image = match frame.channels() {
        3 => image::RgbImage::from_raw(w, h, frame.data().to_vec()).map(image::DynamicImage::from),
        1 => image::GrayImage::from_raw(w, h, frame.data().to_vec()).map(image::DynamicImage::from),
        n => return Err(DispatchError::Encode(format!("unsupported channel count {n}"))),
    }
    .ok_or_else(|| DispatchError::Encode("frame data does not match its dimensions".into()))?;

    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Jpeg)
        .map_err(|e| DispatchError::Encode(e.to_string()))?;
    Ok(bytes)
}
