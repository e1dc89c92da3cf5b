//! Error types for pablo_vision

use thiserror::Error;

#[derive(Error, Debug)]
pub enum VisionError {
    /// The camera source returned no frame.
    #[error("Capture error: {0}")]
    Capture(String),

    /// A per-frame working buffer could not be obtained.
    #[error("Allocation error: {what} ({bytes} bytes)")]
    Allocation { what: &'static str, bytes: usize },

    /// `snap()` was called while the previous frame was still checked out.
    #[error("Frame {sequence} is still checked out; release it before the next snap")]
    FrameOutstanding { sequence: u64 },

    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    #[error("Camera error: {0}")]
    Camera(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Session not initialized")]
    NotInitialized,

    #[error("Worker error: {0}")]
    Worker(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl VisionError {
    /// True for failures that only cost one color its detection for one frame.
    pub fn is_allocation(&self) -> bool {
        matches!(self, VisionError::Allocation { .. })
    }
}

impl From<tokio::task::JoinError> for VisionError {
    fn from(err: tokio::task::JoinError) -> Self {
        VisionError::Worker(err.to_string())
    }
}
