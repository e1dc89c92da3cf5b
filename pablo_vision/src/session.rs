// THEORY:
// The `PerceptionSession` is the public face of the perception core. It owns the
// camera source, the pipeline, the working-memory budget and the only writable
// handle to the result. External collaborators (steering, the behaviour state
// machine) drive it with three calls and read it through accessors:
//
//   initialize()  configure the camera once, zero the result
//   snap()        acquire one frame, process it, commit the result, keep the frame
//   release()     hand the frame back to the camera
//
// At most one frame is ever checked out. The frame stays with the session after
// `snap()` so callers can look at raw pixels; calling `snap()` again before
// `release()` is a usage error and is refused. A capture failure leaves the last
// committed result in place (only its frame handle is cleared) and does not count
// as a processed frame.

use crate::camera::CameraSource;
use crate::config::VisionConfig;
use crate::error::VisionError;
use crate::frame::{Frame, FrameHandle};
use crate::memory::HeapBudget;
use crate::pipeline::{FramePipeline, SnapOutcome};
use crate::result::{PerceptionResult, ResultReader, SharedResult};
use std::time::Duration;
use tracing::{debug, error, info};

/// Where the session is in its acquire/process/release cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No frame checked out.
    Idle,
    /// Waiting on the camera source.
    Capturing,
    /// The pipeline is running over the acquired frame.
    Processing,
    /// A processed frame is checked out until `release()`.
    Holding,
}

pub struct PerceptionSession<C: CameraSource> {
    camera: C,
    config: VisionConfig,
    pipeline: FramePipeline,
    budget: HeapBudget,
    result: SharedResult,
    state: SessionState,
    frame: Option<Frame>,
    initialized: bool,
}

impl<C: CameraSource> PerceptionSession<C> {
    /// Validates `config`; the camera is not touched until `initialize()`.
    pub fn new(camera: C, config: VisionConfig) -> Result<Self, VisionError> {
        config.validate()?;
        Ok(Self {
            pipeline: FramePipeline::new(&config),
            budget: HeapBudget::new(config.memory_budget),
            camera,
            config,
            result: SharedResult::new(),
            state: SessionState::Idle,
            frame: None,
            initialized: false,
        })
    }

    /// Configures the camera and zeroes the result.
    pub fn initialize(&mut self) -> Result<(), VisionError> {
        info!("Initializing perception session...");
        self.release();
        self.initialized = false;

        if let Err(e) = self.camera.configure(&self.config.sensor) {
            error!("Camera initialization failed: {}", e);
            return Err(e);
        }
        self.result.reset();
        self.initialized = true;

        let sensor = &self.config.sensor;
        info!(
            "Sensor: {:?} {:?} xclk={}Hz brightness={} contrast={} saturation={} aec={}({}) agc={}({}) awb={}",
            sensor.pixel_format,
            sensor.frame_size,
            sensor.xclk_freq_hz,
            sensor.brightness,
            sensor.contrast,
            sensor.saturation,
            sensor.auto_exposure,
            sensor.aec_value,
            sensor.auto_gain,
            sensor.agc_gain,
            sensor.white_balance
        );
        info!("Primary HSV: {}", self.config.primary_range);
        info!("Secondary HSV: {}", self.config.secondary_range);
        info!("Min blob area: {} pixels", self.config.min_blob_area);
        info!("Perception session ready");
        Ok(())
    }

    /// Acquires and processes one frame.
    ///
    /// On success the result is committed and the frame stays checked out until
    /// `release()`. The outcome says whether any color had to be skipped.
    pub fn snap(&mut self) -> Result<SnapOutcome, VisionError> {
        if !self.initialized {
            return Err(VisionError::NotInitialized);
        }
        if let Some(frame) = &self.frame {
            error!("snap() called while frame {} is still checked out", frame.sequence());
            return Err(VisionError::FrameOutstanding {
                sequence: frame.sequence(),
            });
        }

        self.state = SessionState::Capturing;
        let frame = match self.camera.acquire() {
            Ok(frame) => frame,
            Err(e) => {
                error!("Failed to capture frame: {}", e);
                self.state = SessionState::Idle;
                self.result.set_frame(None);
                return Err(e);
            }
        };

        if (frame.width(), frame.height()) != (self.config.image_width, self.config.image_height) {
            let err = VisionError::InvalidFrame(format!(
                "expected {}x{}, camera delivered {}x{}",
                self.config.image_width,
                self.config.image_height,
                frame.width(),
                frame.height()
            ));
            error!("Rejecting frame {}: {}", frame.sequence(), err);
            self.camera.release(frame);
            self.state = SessionState::Idle;
            self.result.set_frame(None);
            return Err(err);
        }

        self.state = SessionState::Processing;
        let (primary, secondary, process_time, outcome) =
            self.pipeline.process(&frame, &self.budget).into_outcome();

        let frame_number = self.result.read(|current| current.frame_number) + 1;
        self.result.commit(PerceptionResult {
            primary,
            secondary,
            frame_number,
            process_time,
            frame: Some(frame.handle()),
        });
        debug!(
            "Committed frame {} (sequence {}) in {:?}",
            frame_number,
            frame.sequence(),
            process_time
        );

        self.frame = Some(frame);
        self.state = SessionState::Holding;
        Ok(outcome)
    }

    /// Returns the checked-out frame to the camera. A no-op when nothing is out.
    pub fn release(&mut self) {
        if let Some(frame) = self.frame.take() {
            debug!("Releasing frame {}", frame.sequence());
            self.camera.release(frame);
            self.result.set_frame(None);
        }
        self.state = SessionState::Idle;
    }

    pub fn is_primary_found(&self) -> bool {
        self.result.read(PerceptionResult::is_primary_found)
    }

    pub fn primary_offset(&self) -> i32 {
        self.result.read(PerceptionResult::primary_offset)
    }

    pub fn primary_area(&self) -> u32 {
        self.result.read(PerceptionResult::primary_area)
    }

    pub fn secondary_count(&self) -> usize {
        self.result.read(PerceptionResult::secondary_count)
    }

    /// 0 for an index outside `0..2`.
    pub fn secondary_offset(&self, index: usize) -> i32 {
        self.result.read(|r| r.secondary_offset(index))
    }

    /// 0 for an index outside `0..2`.
    pub fn secondary_area(&self, index: usize) -> u32 {
        self.result.read(|r| r.secondary_area(index))
    }

    pub fn frame_number(&self) -> u64 {
        self.result.read(PerceptionResult::frame_number)
    }

    pub fn process_time(&self) -> Duration {
        self.result.read(PerceptionResult::process_time)
    }

    pub fn raw_frame_handle(&self) -> Option<FrameHandle> {
        self.result.read(PerceptionResult::raw_frame_handle)
    }

    /// Pixels of the checked-out frame.
    pub fn raw_frame(&self) -> Option<&Frame> {
        self.frame.as_ref()
    }

    pub fn result(&self) -> PerceptionResult {
        self.result.snapshot()
    }

    pub fn reader(&self) -> ResultReader {
        self.result.reader()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn config(&self) -> &VisionConfig {
        &self.config
    }

    pub fn budget(&self) -> &HeapBudget {
        &self.budget
    }

    pub fn camera(&self) -> &C {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut C {
        &mut self.camera
    }
}

impl<C: CameraSource> Drop for PerceptionSession<C> {
    fn drop(&mut self) {
        self.release();
    }
}
