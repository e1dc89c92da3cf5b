// THEORY:
// A `BlobInfo` is the summary of one connected component of a binary mask: how many
// pixels it has, the running coordinate sums its centroid is derived from, and its
// bounding box. Like every other per-frame container in this crate it is a "dumb"
// value: created during extraction, consumed immediately to fill the result.
//
// Centroids use integer division (truncating), and a horizontal offset is measured
// from `width / 2`, so a blob centred on the middle column reports 0.

/// A 2D pixel coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Point {
    pub x: u32,
    pub y: u32,
}

/// Inclusive bounds of a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BoundingBox {
    pub x_min: u32,
    pub x_max: u32,
    pub y_min: u32,
    pub y_max: u32,
}

impl BoundingBox {
    /// A box that any point will replace on first `include`.
    pub fn empty() -> Self {
        Self {
            x_min: u32::MAX,
            x_max: 0,
            y_min: u32::MAX,
            y_max: 0,
        }
    }

    pub fn include(&mut self, x: u32, y: u32) {
        self.x_min = self.x_min.min(x);
        self.x_max = self.x_max.max(x);
        self.y_min = self.y_min.min(y);
        self.y_max = self.y_max.max(y);
    }

    pub fn width(&self) -> u32 {
        self.x_max.saturating_sub(self.x_min) + 1
    }

    pub fn height(&self) -> u32 {
        self.y_max.saturating_sub(self.y_min) + 1
    }
}

/// One connected component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobInfo {
    /// Raster-order rank among all components of the mask. Ties in size are
    /// broken in favour of the lower value.
    pub discovery_index: usize,
    /// Area in pixels.
    pub pixel_count: u32,
    pub x_sum: u64,
    pub y_sum: u64,
    pub bounding_box: BoundingBox,
    /// The flood fill ran out of frontier capacity at least once while growing this
    /// component, so `pixel_count` may undercount its true extent.
    pub truncated: bool,
}

impl BlobInfo {
    pub(crate) fn seed(discovery_index: usize) -> Self {
        Self {
            discovery_index,
            pixel_count: 0,
            x_sum: 0,
            y_sum: 0,
            bounding_box: BoundingBox::empty(),
            truncated: false,
        }
    }

    pub(crate) fn add_pixel(&mut self, x: u32, y: u32) {
        self.pixel_count += 1;
        self.x_sum += x as u64;
        self.y_sum += y as u64;
        self.bounding_box.include(x, y);
    }

    pub fn centroid(&self) -> Point {
        if self.pixel_count == 0 {
            return Point::default();
        }
        let count = self.pixel_count as u64;
        Point {
            x: (self.x_sum / count) as u32,
            y: (self.y_sum / count) as u32,
        }
    }

    /// Signed distance of the centroid from the image's vertical center line.
    pub fn offset_x(&self, image_width: u32) -> i32 {
        self.centroid().x as i32 - (image_width / 2) as i32
    }

    /// Horizontal distance between two centroids, i.e. the difference in bearing.
    pub fn centroid_dx(&self, other: &BlobInfo) -> u32 {
        self.centroid().x.abs_diff(other.centroid().x)
    }
}
