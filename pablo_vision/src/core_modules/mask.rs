// THEORY:
// A `Mask` is the binary classification plane for one color in one frame: one byte
// per pixel, 0 or 255, row-major. It is created fresh per frame per color, leased
// from the frame's `HeapBudget`, and dropped as soon as extraction is done.

use crate::error::VisionError;
use crate::memory::{Buffer, HeapBudget};

/// Binary per-pixel classification result.
#[derive(Debug)]
pub struct Mask {
    width: usize,
    height: usize,
    data: Buffer<u8>,
}

impl Mask {
    pub const FOREGROUND: u8 = 255;
    pub const BACKGROUND: u8 = 0;

    /// An all-background mask.
    pub fn new(width: usize, height: usize, budget: &HeapBudget) -> Result<Self, VisionError> {
        let len = width
            .checked_mul(height)
            .ok_or(VisionError::Allocation { what: "mask", bytes: usize::MAX })?;
        let data = budget.filled("mask", len, Self::BACKGROUND)?;
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn index(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    #[inline]
    pub fn is_foreground(&self, x: usize, y: usize) -> bool {
        self.data[self.index(x, y)] != Self::BACKGROUND
    }

    pub fn set(&mut self, x: usize, y: usize, foreground: bool) {
        let index = self.index(x, y);
        self.data[index] = if foreground {
            Self::FOREGROUND
        } else {
            Self::BACKGROUND
        };
    }

    /// Marks the rectangle `[x, x + w) x [y, y + h)`, clipped to the mask.
    pub fn fill_rect(&mut self, x: usize, y: usize, w: usize, h: usize) {
        let x_end = (x + w).min(self.width);
        let y_end = (y + h).min(self.height);
        for row in y.min(y_end)..y_end {
            let start = self.index(x.min(x_end), row);
            let end = self.index(x_end, row);
            self.data[start..end].fill(Self::FOREGROUND);
        }
    }

    pub fn count_foreground(&self) -> usize {
        self.data.iter().filter(|&&v| v != Self::BACKGROUND).count()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }
}
