//! Camera sources: where frames come from and where they go back to.

use crate::config::{PixelFormat, SensorSettings};
use crate::error::VisionError;
use crate::frame::Frame;
use image::RgbImage;
use image::imageops::{self, FilterType};
use std::path::Path;
use tracing::{debug, info, warn};

/// A producer of frames with exclusive checkout.
///
/// `acquire` moves a frame out of the source and `release` moves it back. A source
/// never hands out a second frame while the first one is still out.
pub trait CameraSource: Send {
    /// Applies the sensor settings. Called once, before the first `acquire`.
    fn configure(&mut self, settings: &SensorSettings) -> Result<(), VisionError>;

    /// Checks out the next frame.
    fn acquire(&mut self) -> Result<Frame, VisionError>;

    /// Returns a frame obtained from `acquire`.
    fn release(&mut self, frame: Frame);
}

impl<C: CameraSource + ?Sized> CameraSource for Box<C> {
    fn configure(&mut self, settings: &SensorSettings) -> Result<(), VisionError> {
        (**self).configure(settings)
    }

    fn acquire(&mut self) -> Result<Frame, VisionError> {
        (**self).acquire()
    }

    fn release(&mut self, frame: Frame) {
        (**self).release(frame)
    }
}

/// Replays decoded images as if they came off the sensor.
#[derive(Debug)]
pub struct ReplayCamera {
    /// Decoded originals, kept so a later `configure` can resize from full quality.
    sources: Vec<RgbImage>,
    /// Sensor-ready frames at the configured size.
    frames: Vec<Frame>,
    cursor: usize,
    looping: bool,
    outstanding: Option<u64>,
    next_sequence: u64,
    settings: Option<SensorSettings>,
}

impl ReplayCamera {
    pub fn from_images(images: Vec<RgbImage>) -> Self {
        let frames = images
            .iter()
            .map(|image| Frame::from_rgb_image(image, 0))
            .collect();
        Self {
            sources: images,
            frames,
            cursor: 0,
            looping: false,
            outstanding: None,
            next_sequence: 0,
            settings: None,
        }
    }

    pub fn from_frames(frames: Vec<Frame>) -> Self {
        Self::from_images(frames.iter().map(Frame::to_rgb_image).collect())
    }

    /// Decodes every image file in `paths`.
    pub fn open<P: AsRef<Path>>(paths: &[P]) -> Result<Self, VisionError> {
        let mut images = Vec::with_capacity(paths.len());
        for path in paths {
            let path = path.as_ref();
            let image = image::open(path)?.to_rgb8();
            debug!("Loaded {} ({}x{})", path.display(), image.width(), image.height());
            images.push(image);
        }
        Ok(Self::from_images(images))
    }

    /// Starts over from the first image after the last one.
    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Sequence number of the frame currently checked out.
    pub fn outstanding(&self) -> Option<u64> {
        self.outstanding
    }

    pub fn settings(&self) -> Option<&SensorSettings> {
        self.settings.as_ref()
    }

    pub fn rewind(&mut self) {
        self.cursor = 0;
    }
}

impl CameraSource for ReplayCamera {
    fn configure(&mut self, settings: &SensorSettings) -> Result<(), VisionError> {
        if settings.pixel_format != PixelFormat::Rgb565 {
            return Err(VisionError::Camera(format!(
                "Unsupported pixel format {:?}",
                settings.pixel_format
            )));
        }
        let (width, height) = settings.frame_size.dimensions();
        if width == 0 || height == 0 {
            return Err(VisionError::Camera("Frame size must be non-zero".to_string()));
        }

        self.frames = self
            .sources
            .iter()
            .map(|image| {
                if image.dimensions() == (width, height) {
                    Frame::from_rgb_image(image, 0)
                } else {
                    let resized = imageops::resize(image, width, height, FilterType::Nearest);
                    Frame::from_rgb_image(&resized, 0)
                }
            })
            .collect();
        self.settings = Some(settings.clone());

        info!(
            "Replay camera configured: {} frames at {}x{}, looping={}",
            self.frames.len(),
            width,
            height,
            self.looping
        );
        Ok(())
    }

    fn acquire(&mut self) -> Result<Frame, VisionError> {
        if let Some(sequence) = self.outstanding {
            return Err(VisionError::Camera(format!(
                "Frame {sequence} has not been returned"
            )));
        }
        if self.cursor >= self.frames.len() {
            if self.looping && !self.frames.is_empty() {
                self.cursor = 0;
            } else {
                return Err(VisionError::Capture("Replay exhausted".to_string()));
            }
        }

        let sequence = self.next_sequence;
        let frame = self.frames[self.cursor].clone().with_sequence(sequence);
        self.cursor += 1;
        self.next_sequence += 1;
        self.outstanding = Some(sequence);
        Ok(frame)
    }

    fn release(&mut self, frame: Frame) {
        match self.outstanding {
            Some(sequence) if sequence == frame.sequence() => self.outstanding = None,
            other => warn!(
                "Returned frame {} does not match checked-out frame {:?}",
                frame.sequence(),
                other
            ),
        }
    }
}
