//! Captured frames and the opaque handle published with each result.

use crate::core_modules::pixel::pixel::{BYTES_PER_PIXEL, Pixel};
use crate::error::VisionError;
use image::{ImageBuffer, RgbImage};

/// One captured image: RGB565, big-endian, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    width: u32,
    height: u32,
    data: Vec<u8>,
    sequence: u64,
}

/// Identifies the frame a result was computed from without giving access to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle {
    pub sequence: u64,
    pub width: u32,
    pub height: u32,
}

impl Frame {
    pub fn new(width: u32, height: u32, data: Vec<u8>, sequence: u64) -> Result<Self, VisionError> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|pixels| pixels.checked_mul(BYTES_PER_PIXEL))
            .ok_or_else(|| VisionError::InvalidFrame(format!("{width}x{height} overflows")))?;
        if data.len() != expected {
            return Err(VisionError::InvalidFrame(format!(
                "{width}x{height} RGB565 needs {expected} bytes, got {}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
            sequence,
        })
    }

    /// Paints a frame pixel by pixel.
    pub fn from_fn<F>(width: u32, height: u32, sequence: u64, mut paint: F) -> Self
    where
        F: FnMut(u32, u32) -> Pixel,
    {
        let mut data = Vec::with_capacity(width as usize * height as usize * BYTES_PER_PIXEL);
        for y in 0..height {
            for x in 0..width {
                data.extend_from_slice(&paint(x, y).to_be_bytes());
            }
        }
        Self {
            width,
            height,
            data,
            sequence,
        }
    }

    pub fn from_rgb_image(image: &RgbImage, sequence: u64) -> Self {
        Self::from_fn(image.width(), image.height(), sequence, |x, y| {
            let [r, g, b] = image.get_pixel(x, y).0;
            Pixel::new(r, g, b)
        })
    }

    /// Widens back to RGB888 for diagnostics.
    pub fn to_rgb_image(&self) -> RgbImage {
        ImageBuffer::from_fn(self.width, self.height, |x, y| {
            let index = (y * self.width + x) as usize;
            image::Rgb(self.pixel(index).into())
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = sequence;
        self
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn pixel_count(&self) -> usize {
        self.data.len() / BYTES_PER_PIXEL
    }

    /// Pixel at row-major `index`.
    pub fn pixel(&self, index: usize) -> Pixel {
        let offset = index * BYTES_PER_PIXEL;
        Pixel::from([self.data[offset], self.data[offset + 1]])
    }

    pub fn pixels(&self) -> impl Iterator<Item = Pixel> + '_ {
        self.data
            .chunks_exact(BYTES_PER_PIXEL)
            .map(|bytes| Pixel::from([bytes[0], bytes[1]]))
    }

    pub fn handle(&self) -> FrameHandle {
        FrameHandle {
            sequence: self.sequence,
            width: self.width,
            height: self.height,
        }
    }
}
