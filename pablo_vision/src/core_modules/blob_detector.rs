// THEORY:
// The `BlobDetector` is the engine of the spatial grouping layer. It takes one
// binary mask and groups its foreground pixels into 4-connected components.
//
// Key architectural principles & algorithm steps:
// 1.  **Raster Scan**: The mask is scanned row by row. The first unvisited
//     foreground pixel found becomes the seed of a new component, so components are
//     discovered (and numbered) in raster order.
// 2.  **Bounded Flood Fill**: From the seed, the component is grown with an explicit
//     work stack, never with call recursion. The stack is leased once per scan with
//     a fixed capacity and reused for every component; it never grows. When it is
//     full, a neighbour that would have been pushed is skipped and the component is
//     flagged `truncated`. A skipped pixel stays unvisited, so it can still be reached
//     from another frontier pixel or seed a later component.
// 3.  **Aggregation**: While filling, pixel count, coordinate sums and the bounding
//     box are accumulated into a `BlobInfo`.
// 4.  **Selection**: Callers either keep the single largest component, or keep the
//     top K qualifying components in a fixed-size list sorted by descending size.
//     Equal sizes keep discovery order, which makes the result reproducible.
// 5.  **Stateless Utility**: The detector keeps no state between calls; the visited
//     map and the stack live only for the duration of one scan.

use crate::core_modules::blob::BlobInfo;
use crate::core_modules::mask::Mask;
use crate::error::VisionError;
use crate::memory::{Buffer, HeapBudget};

pub mod blob_detector {
    use super::*; // Make types from parent module available.

    /// Frontier capacity of the flood fill on the sensor module.
    pub const DEFAULT_STACK_CAPACITY: usize = 4000;

    /// Connected-component extractor with a bounded frontier.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct BlobDetector {
        stack_capacity: usize,
        min_area: u32,
    }

    impl Default for BlobDetector {
        fn default() -> Self {
            Self::new(DEFAULT_STACK_CAPACITY, 4)
        }
    }

    impl BlobDetector {
        /// `stack_capacity` is clamped to at least one entry (the seed).
        pub fn new(stack_capacity: usize, min_area: u32) -> Self {
            Self {
                stack_capacity: stack_capacity.max(1),
                min_area,
            }
        }

        pub fn stack_capacity(&self) -> usize {
            self.stack_capacity
        }

        pub fn min_area(&self) -> u32 {
            self.min_area
        }

        /// The component with the most pixels, regardless of `min_area`.
        /// Ties go to the component discovered first.
        pub fn find_largest(
            &self,
            mask: &Mask,
            budget: &HeapBudget,
        ) -> Result<Option<BlobInfo>, VisionError> {
            let mut largest: Option<BlobInfo> = None;
            self.scan(mask, budget, |blob| {
                let replace = match &largest {
                    Some(current) => blob.pixel_count > current.pixel_count,
                    None => true,
                };
                if replace {
                    largest = Some(blob);
                }
            })?;
            Ok(largest)
        }

        /// Up to `k` components with at least `min_area` pixels, largest first.
        pub fn find_top_k(
            &self,
            mask: &Mask,
            k: usize,
            budget: &HeapBudget,
        ) -> Result<Vec<BlobInfo>, VisionError> {
            let mut ranked = Vec::with_capacity(k);
            if k == 0 {
                return Ok(ranked);
            }
            self.scan(mask, budget, |blob| {
                if blob.pixel_count >= self.min_area {
                    insert_ranked(&mut ranked, k, blob);
                }
            })?;
            Ok(ranked)
        }

        /// Visits every component in raster discovery order. Returns how many were found.
        pub fn scan<F>(&self, mask: &Mask, budget: &HeapBudget, mut visit: F) -> Result<usize, VisionError>
        where
            F: FnMut(BlobInfo),
        {
            let (width, height) = (mask.width(), mask.height());
            if mask.is_empty() {
                return Ok(0);
            }

            // Both leases are returned on every exit path, including the `?` below.
            let mut visited = budget.filled("visited map", mask.len(), false)?;
            let mut stack = budget.with_capacity::<u32>("flood-fill stack", self.stack_capacity)?;

            let mut discovered = 0;
            for y in 0..height {
                for x in 0..width {
                    let index = y * width + x;
                    if visited[index] || !mask.is_foreground(x, y) {
                        continue;
                    }
                    let blob = flood_fill(mask, &mut visited, &mut stack, index, discovered);
                    discovered += 1;
                    visit(blob);
                }
            }

            Ok(discovered)
        }
    }

    /// Grows one component from `seed`, marking pixels visited as they are pushed.
    fn flood_fill(
        mask: &Mask,
        visited: &mut [bool],
        stack: &mut Buffer<u32>,
        seed: usize,
        discovery_index: usize,
    ) -> BlobInfo {
        let width = mask.width();
        let height = mask.height();
        let data = mask.as_slice();
        let mut blob = BlobInfo::seed(discovery_index);

        stack.clear();
        visited[seed] = true;
        stack.push_within_capacity(seed as u32);

        while let Some(current) = stack.pop() {
            let current = current as usize;
            let (cx, cy) = (current % width, current / width);
            blob.add_pixel(cx as u32, cy as u32);

            // Check all 4 direct neighbors (not diagonals).
            let neighbors = [
                (cx + 1 < width).then(|| current + 1),
                (cx > 0).then(|| current - 1),
                (cy + 1 < height).then(|| current + width),
                (cy > 0).then(|| current - width),
            ];
            for next in neighbors.into_iter().flatten() {
                if visited[next] || data[next] == Mask::BACKGROUND {
                    continue;
                }
                if stack.push_within_capacity(next as u32) {
                    visited[next] = true;
                } else {
                    blob.truncated = true;
                }
            }
        }

        blob
    }

    /// Inserts into a list kept sorted by descending `pixel_count`, at most `k` long.
    /// A newcomer goes after every entry of equal size; when the list is full the
    /// smallest entry is evicted, but only by a strictly larger newcomer.
    pub fn insert_ranked(ranked: &mut Vec<BlobInfo>, k: usize, blob: BlobInfo) {
        let position = ranked
            .iter()
            .position(|existing| blob.pixel_count > existing.pixel_count)
            .unwrap_or(ranked.len());
        if position >= k {
            return;
        }
        if ranked.len() == k {
            ranked.pop();
        }
        ranked.insert(position, blob);
    }
}
