use ndarray::{s, ArrayView3};

use super::bounding_box::BoundingBox;

/// A single video frame or image crop: contiguous RGB bytes in row-major order.
///
/// Format conversion happens at I/O boundaries only; the tracking core
/// treats pixel data as opaque.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    index: usize,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8, index: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
            index,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Frame data length must match dimensions")
    }

    /// Copies the pixels under `bbox`, clamped to the frame bounds.
    ///
    /// Returns `None` when the clamped area is empty. The crop owns its
    /// buffer and keeps the source frame index.
    pub fn crop(&self, bbox: &BoundingBox) -> Option<Frame> {
        let clamped = bbox.clamp_to(self.width, self.height)?;
        let (x1, y1) = (clamped.x as usize, clamped.y as usize);
        let (x2, y2) = (x1 + clamped.width as usize, y1 + clamped.height as usize);

        let view = self.as_ndarray();
        let data: Vec<u8> = view.slice(s![y1..y2, x1..x2, ..]).iter().copied().collect();

        Some(Frame::new(
            data,
            clamped.width as u32,
            clamped.height as u32,
            self.channels,
            self.index,
        ))
    }

    /// Rec. 601 luma of the pixel at (`x`, `y`), coordinates clamped to the frame.
    pub fn luma_at(&self, x: i32, y: i32) -> f32 {
        let cx = x.clamp(0, self.width as i32 - 1) as usize;
        let cy = y.clamp(0, self.height as i32 - 1) as usize;
        let channels = self.channels as usize;
        let offset = (cy * self.width as usize + cx) * channels;
        if channels < 3 {
            return self.data[offset] as f32;
        }
        let r = self.data[offset] as f32;
        let g = self.data[offset + 1] as f32;
        let b = self.data[offset + 2] as f32;
        0.299 * r + 0.587 * g + 0.114 * b
    }

    fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        )
    }
}
