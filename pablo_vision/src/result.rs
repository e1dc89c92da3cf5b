// THEORY:
// `PerceptionResult` is the one authoritative record of what the last processed frame
// contained. It is what steering and the behaviour state machine read, and they only
// ever read it.
//
// Publication follows a strict single-writer discipline. The session owns the only
// `SharedResult`, the sole handle that can write. Everybody else gets a
// `ResultReader`. A new result is staged in a local value by the pipeline and then
// swapped in under one write lock, so a reader sees either the previous record or
// the new one, never a mixture of both.

use crate::core_modules::blob::BlobInfo;
use crate::frame::FrameHandle;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;

/// Accepted secondary detections per frame.
pub const MAX_SECONDARY: usize = 2;

/// Primary target detection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrimaryTarget {
    pub found: bool,
    /// Pixels from the vertical center line, negative to the left.
    pub offset_x: i32,
    pub area: u32,
    pub blob: Option<BlobInfo>,
    /// Processing for this color failed this frame; `found` is false because of it.
    pub degraded: bool,
}

/// Up to `MAX_SECONDARY` distinct secondary detections, largest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecondaryTargets {
    pub count: usize,
    pub offset_x: [i32; MAX_SECONDARY],
    pub area: [u32; MAX_SECONDARY],
    pub blobs: [Option<BlobInfo>; MAX_SECONDARY],
    pub degraded: bool,
}

impl PrimaryTarget {
    pub fn from_blob(blob: BlobInfo, image_width: u32) -> Self {
        Self {
            found: true,
            offset_x: blob.offset_x(image_width),
            area: blob.pixel_count,
            blob: Some(blob),
            degraded: false,
        }
    }

    pub fn degraded() -> Self {
        Self {
            degraded: true,
            ..Self::default()
        }
    }
}

impl SecondaryTargets {
    /// Fills slots in order; anything past `MAX_SECONDARY` is ignored.
    pub fn from_blobs(blobs: impl IntoIterator<Item = BlobInfo>, image_width: u32) -> Self {
        let mut targets = Self::default();
        for (slot, blob) in blobs.into_iter().take(MAX_SECONDARY).enumerate() {
            targets.offset_x[slot] = blob.offset_x(image_width);
            targets.area[slot] = blob.pixel_count;
            targets.blobs[slot] = Some(blob);
            targets.count = slot + 1;
        }
        targets
    }

    pub fn degraded() -> Self {
        Self {
            degraded: true,
            ..Self::default()
        }
    }
}

/// The per-frame output consumed by steering and the behaviour state machine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PerceptionResult {
    pub primary: PrimaryTarget,
    pub secondary: SecondaryTargets,
    /// Frames processed since initialization.
    pub frame_number: u64,
    pub process_time: Duration,
    /// The frame this result was computed from while it is still checked out.
    pub frame: Option<FrameHandle>,
}

impl PerceptionResult {
    pub fn is_primary_found(&self) -> bool {
        self.primary.found
    }

    pub fn primary_offset(&self) -> i32 {
        self.primary.offset_x
    }

    pub fn primary_area(&self) -> u32 {
        self.primary.area
    }

    pub fn secondary_count(&self) -> usize {
        self.secondary.count
    }

    /// Out-of-range indices read as 0.
    pub fn secondary_offset(&self, index: usize) -> i32 {
        self.secondary.offset_x.get(index).copied().unwrap_or(0)
    }

    /// Out-of-range indices read as 0.
    pub fn secondary_area(&self, index: usize) -> u32 {
        self.secondary.area.get(index).copied().unwrap_or(0)
    }

    pub fn frame_number(&self) -> u64 {
        self.frame_number
    }

    pub fn process_time(&self) -> Duration {
        self.process_time
    }

    pub fn raw_frame_handle(&self) -> Option<FrameHandle> {
        self.frame
    }

    /// At least one color could not be processed for this frame.
    pub fn is_degraded(&self) -> bool {
        self.primary.degraded || self.secondary.degraded
    }
}

/// The writable side. Not `Clone`: there is exactly one writer.
#[derive(Debug, Default)]
pub struct SharedResult {
    inner: Arc<RwLock<PerceptionResult>>,
}

impl SharedResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole record at once.
    pub fn commit(&self, result: PerceptionResult) {
        *self.inner.write() = result;
    }

    /// Updates only the frame handle; used on release and on capture failure.
    pub fn set_frame(&self, frame: Option<FrameHandle>) {
        self.inner.write().frame = frame;
    }

    /// Back to the all-zero startup record.
    pub fn reset(&self) {
        self.commit(PerceptionResult::default());
    }

    pub fn snapshot(&self) -> PerceptionResult {
        self.inner.read().clone()
    }

    pub fn reader(&self) -> ResultReader {
        ResultReader {
            inner: Arc::clone(&self.inner),
        }
    }

    pub(crate) fn read<R>(&self, f: impl FnOnce(&PerceptionResult) -> R) -> R {
        f(&self.inner.read())
    }
}

/// Read-only view of the committed result. Cheap to clone and safe to share.
#[derive(Debug, Clone)]
pub struct ResultReader {
    inner: Arc<RwLock<PerceptionResult>>,
}

impl ResultReader {
    pub fn snapshot(&self) -> PerceptionResult {
        self.inner.read().clone()
    }

    pub fn is_primary_found(&self) -> bool {
        self.inner.read().is_primary_found()
    }

    pub fn primary_offset(&self) -> i32 {
        self.inner.read().primary_offset()
    }

    pub fn primary_area(&self) -> u32 {
        self.inner.read().primary_area()
    }

    pub fn secondary_count(&self) -> usize {
        self.inner.read().secondary_count()
    }

    pub fn secondary_offset(&self, index: usize) -> i32 {
        self.inner.read().secondary_offset(index)
    }

    pub fn secondary_area(&self, index: usize) -> u32 {
        self.inner.read().secondary_area(index)
    }

    pub fn frame_number(&self) -> u64 {
        self.inner.read().frame_number()
    }

    pub fn process_time(&self) -> Duration {
        self.inner.read().process_time()
    }

    pub fn raw_frame_handle(&self) -> Option<FrameHandle> {
        self.inner.read().raw_frame_handle()
    }
}
