// THEORY:
// This file is the main entry point for the `pablo_vision` library crate, the
// perception core of a small autonomous ground robot. It turns one RGB565 camera
// frame into the handful of numbers the steering and behaviour logic act on: is the
// primary (yellow) target visible, how far left or right of center is it and how big
// is it, and where are up to two distinct secondary (pink) markers.
//
// The public surface is the `PerceptionSession` (initialize / snap / release plus
// read-only accessors) and the `ResultReader` it hands out. The per-frame building
// blocks in `core_modules` are public for diagnostics and tests, but a robot only
// ever needs the session.

pub mod camera;
pub mod config;
pub mod core_modules;
pub mod error;
pub mod frame;
pub mod memory;
pub mod pipeline;
pub mod result;
pub mod session;
pub mod worker;

pub use camera::{CameraSource, ReplayCamera};
pub use config::{FrameSize, PixelFormat, SensorSettings, VisionConfig};
pub use core_modules::blob::{BlobInfo, BoundingBox, Point};
pub use core_modules::classifier::ColorRange;
pub use core_modules::pixel::pixel::{Hsv, Pixel};
pub use error::VisionError;
pub use frame::{Frame, FrameHandle};
pub use memory::HeapBudget;
pub use pipeline::{FramePipeline, SnapOutcome, TargetFailure, TargetRole};
pub use result::{MAX_SECONDARY, PerceptionResult, PrimaryTarget, ResultReader, SecondaryTargets};
pub use session::{PerceptionSession, SessionState};
pub use worker::PerceptionWorker;
