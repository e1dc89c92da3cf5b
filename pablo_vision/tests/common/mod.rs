//! Shared fixtures for the integration tests

#![allow(dead_code)]

use pablo_vision::{CameraSource, Frame, Pixel, SensorSettings, VisionError};
use std::collections::VecDeque;

pub const WIDTH: u32 = 160;
pub const HEIGHT: u32 = 120;

pub const YELLOW: Pixel = Pixel::new(255, 255, 0);
pub const PINK: Pixel = Pixel::new(255, 0, 160);

/// A filled rectangle: inclusive x range, inclusive y range, color.
pub struct Patch {
    pub x: (u32, u32),
    pub y: (u32, u32),
    pub color: Pixel,
}

pub fn patch(x: (u32, u32), y: (u32, u32), color: Pixel) -> Patch {
    Patch { x, y, color }
}

/// A black QQVGA frame with `patches` painted on it; later patches win.
pub fn scene(patches: &[Patch]) -> Frame {
    Frame::from_fn(WIDTH, HEIGHT, 0, |x, y| {
        patches
            .iter()
            .rev()
            .find(|p| (p.x.0..=p.x.1).contains(&x) && (p.y.0..=p.y.1).contains(&y))
            .map(|p| p.color)
            .unwrap_or_default()
    })
}

/// Plays back a fixed script of frames and capture failures.
pub struct ScriptedCamera {
    script: VecDeque<Option<Frame>>,
    next_sequence: u64,
    pub outstanding: Option<u64>,
    pub configured: bool,
    pub releases: usize,
    pub fail_configure: bool,
}

impl ScriptedCamera {
    pub fn new(script: Vec<Option<Frame>>) -> Self {
        Self {
            script: script.into(),
            next_sequence: 0,
            outstanding: None,
            configured: false,
            releases: 0,
            fail_configure: false,
        }
    }
}

impl CameraSource for ScriptedCamera {
    fn configure(&mut self, _settings: &SensorSettings) -> Result<(), VisionError> {
        if self.fail_configure {
            return Err(VisionError::Camera("sensor not detected".to_string()));
        }
        self.configured = true;
        Ok(())
    }

    fn acquire(&mut self) -> Result<Frame, VisionError> {
        assert!(self.outstanding.is_none(), "second frame requested while one is out");
        match self.script.pop_front() {
            Some(Some(frame)) => {
                let sequence = self.next_sequence;
                self.next_sequence += 1;
                self.outstanding = Some(sequence);
                Ok(frame.with_sequence(sequence))
            }
            _ => Err(VisionError::Capture("no frame".to_string())),
        }
    }

    fn release(&mut self, frame: Frame) {
        assert_eq!(self.outstanding, Some(frame.sequence()));
        self.outstanding = None;
        self.releases += 1;
    }
}
