// THEORY:
// The classifier is the first spatial step of the pipeline: it turns one frame into
// one binary `Mask` for one named color. A `ColorRange` is a closed box in the
// sensor's integer HSV space. Hue is circular, so a range whose `h_min` is larger
// than its `h_max` is read as wrapping through 179 -> 0 (reds live there).
//
// Classification is a pure function of the frame and the range. Every target color
// goes through this same function; the pipeline never special-cases a color here.

use crate::core_modules::mask::Mask;
use crate::core_modules::pixel::pixel::{Hsv, Hue};
use crate::error::VisionError;
use crate::frame::Frame;
use crate::memory::HeapBudget;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Acceptance volume for one target color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColorRange {
    pub h_min: Hue,
    pub h_max: Hue,
    pub s_min: u8,
    pub s_max: u8,
    pub v_min: u8,
    pub v_max: u8,
}

impl ColorRange {
    /// Primary target: yellow marker.
    pub const YELLOW: ColorRange = ColorRange::new(15, 40, 80, 255, 80, 255);
    /// Secondary target: pink obstacle markers.
    pub const PINK: ColorRange = ColorRange::new(145, 175, 140, 255, 50, 255);

    pub const fn new(h_min: Hue, h_max: Hue, s_min: u8, s_max: u8, v_min: u8, v_max: u8) -> Self {
        Self {
            h_min,
            h_max,
            s_min,
            s_max,
            v_min,
            v_max,
        }
    }

    /// Hue interval passes through 179 -> 0.
    pub fn wraps(&self) -> bool {
        self.h_min > self.h_max
    }

    pub fn contains(&self, hsv: Hsv) -> bool {
        let s_match = (self.s_min..=self.s_max).contains(&hsv.saturation);
        let v_match = (self.v_min..=self.v_max).contains(&hsv.value);
        if !s_match || !v_match {
            return false;
        }

        if self.wraps() {
            hsv.hue >= self.h_min || hsv.hue <= self.h_max
        } else {
            (self.h_min..=self.h_max).contains(&hsv.hue)
        }
    }
}

impl fmt::Display for ColorRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "H={}-{} S={}-{} V={}-{}{}",
            self.h_min,
            self.h_max,
            self.s_min,
            self.s_max,
            self.v_min,
            self.v_max,
            if self.wraps() { " [WRAP]" } else { "" }
        )
    }
}

/// Builds the binary mask of `range` over `frame`. Member pixels are 255, others 0.
pub fn classify(frame: &Frame, range: &ColorRange, budget: &HeapBudget) -> Result<Mask, VisionError> {
    let mut mask = Mask::new(frame.width() as usize, frame.height() as usize, budget)?;
    for (cell, pixel) in mask.as_mut_slice().iter_mut().zip(frame.pixels()) {
        if range.contains(pixel.hsv()) {
            *cell = Mask::FOREGROUND;
        }
    }
    Ok(mask)
}
