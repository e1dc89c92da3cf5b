// THEORY:
// The `pipeline` module drives one frame through the whole perception stack and
// stages the result. It is the only code that decides what a frame "contains".
//
// Every target color is an entry in the same table and goes through the same three
// stages: classify into a mask, close the mask, extract components. Only the final
// selection differs by role:
// - Primary: the single largest component, if it reaches the minimum area.
// - Secondary: the top raw candidates by area, then a greedy pass that accepts a
//   candidate only if its centroid column is far enough from every centroid
//   column already accepted. A near candidate is a duplicate and is dropped, never merged.
//
// Colors are processed one after the other. Each color leases and frees its own
// buffers, so a color whose buffers cannot be obtained is reported as degraded
// while the other color is still processed normally.

use crate::config::VisionConfig;
use crate::core_modules::blob::BlobInfo;
use crate::core_modules::blob_detector::blob_detector::BlobDetector;
use crate::core_modules::classifier::{ColorRange, classify};
use crate::core_modules::mask::Mask;
use crate::core_modules::morphology;
use crate::error::VisionError;
use crate::frame::Frame;
use crate::memory::HeapBudget;
use crate::result::{MAX_SECONDARY, PrimaryTarget, SecondaryTargets};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// What a color is looked for as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetRole {
    Primary,
    Secondary,
}

impl fmt::Display for TargetRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetRole::Primary => write!(f, "primary"),
            TargetRole::Secondary => write!(f, "secondary"),
        }
    }
}

/// One row of the color table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorTarget {
    pub role: TargetRole,
    pub range: ColorRange,
}

/// A color that could not be processed this frame.
#[derive(Debug)]
pub struct TargetFailure {
    pub role: TargetRole,
    pub error: VisionError,
}

/// How a processed frame went.
#[derive(Debug)]
pub enum SnapOutcome {
    /// Every color was processed.
    Complete,
    /// The result was committed, but these colors report "not found" only because
    /// they could not be processed.
    Degraded(Vec<TargetFailure>),
}

impl SnapOutcome {
    pub fn is_complete(&self) -> bool {
        matches!(self, SnapOutcome::Complete)
    }

    pub fn failures(&self) -> &[TargetFailure] {
        match self {
            SnapOutcome::Complete => &[],
            SnapOutcome::Degraded(failures) => failures,
        }
    }
}

/// The staged, not yet published, output of one frame.
#[derive(Debug)]
pub struct FrameAnalysis {
    pub primary: PrimaryTarget,
    pub secondary: SecondaryTargets,
    pub failures: Vec<TargetFailure>,
    pub elapsed: Duration,
}

impl FrameAnalysis {
    pub fn into_outcome(self) -> (PrimaryTarget, SecondaryTargets, Duration, SnapOutcome) {
        let outcome = if self.failures.is_empty() {
            SnapOutcome::Complete
        } else {
            SnapOutcome::Degraded(self.failures)
        };
        (self.primary, self.secondary, self.elapsed, outcome)
    }
}

/// The per-frame orchestrator.
#[derive(Debug, Clone)]
pub struct FramePipeline {
    targets: [ColorTarget; 2],
    detector: BlobDetector,
    close_radius: usize,
    min_separation: u32,
    raw_secondary_candidates: usize,
}

impl FramePipeline {
    pub fn new(config: &VisionConfig) -> Self {
        Self {
            targets: [
                ColorTarget {
                    role: TargetRole::Primary,
                    range: config.primary_range,
                },
                ColorTarget {
                    role: TargetRole::Secondary,
                    range: config.secondary_range,
                },
            ],
            detector: BlobDetector::new(config.flood_stack_capacity, config.min_blob_area),
            close_radius: config.close_radius,
            min_separation: config.min_separation,
            raw_secondary_candidates: config.raw_secondary_candidates,
        }
    }

    pub fn targets(&self) -> &[ColorTarget] {
        &self.targets
    }

    pub fn detector(&self) -> &BlobDetector {
        &self.detector
    }

    /// Runs every color of the table over `frame`. Never fails as a whole; a color
    /// that cannot be processed is recorded in `failures` and marked degraded.
    pub fn process(&self, frame: &Frame, budget: &HeapBudget) -> FrameAnalysis {
        let start = Instant::now();
        let mut analysis = FrameAnalysis {
            primary: PrimaryTarget::default(),
            secondary: SecondaryTargets::default(),
            failures: Vec::new(),
            elapsed: Duration::ZERO,
        };

        for target in &self.targets {
            // The mask and every scan buffer are dropped at the end of this call.
            let processed = self.filtered_mask(frame, &target.range, budget).and_then(|mask| {
                match target.role {
                    TargetRole::Primary => {
                        analysis.primary = self.primary_from_mask(&mask, budget)?;
                    }
                    TargetRole::Secondary => {
                        analysis.secondary = self.secondary_from_mask(&mask, budget)?;
                    }
                }
                Ok(())
            });

            if let Err(error) = processed {
                warn!("Frame {}: {} color degraded: {}", frame.sequence(), target.role, error);
                match target.role {
                    TargetRole::Primary => analysis.primary = PrimaryTarget::degraded(),
                    TargetRole::Secondary => analysis.secondary = SecondaryTargets::degraded(),
                }
                analysis.failures.push(TargetFailure {
                    role: target.role,
                    error,
                });
            }
        }

        analysis.elapsed = start.elapsed();
        debug!(
            "Frame {}: primary found={} area={} offset={}, secondary count={} areas={:?}, {:?}",
            frame.sequence(),
            analysis.primary.found,
            analysis.primary.area,
            analysis.primary.offset_x,
            analysis.secondary.count,
            analysis.secondary.area,
            analysis.elapsed
        );
        analysis
    }

    /// Classify then close.
    pub fn filtered_mask(
        &self,
        frame: &Frame,
        range: &ColorRange,
        budget: &HeapBudget,
    ) -> Result<Mask, VisionError> {
        let mut mask = classify(frame, range, budget)?;
        morphology::close(&mut mask, self.close_radius, budget)?;
        Ok(mask)
    }

    /// The largest component, reported only if it reaches the minimum area.
    pub fn primary_from_mask(&self, mask: &Mask, budget: &HeapBudget) -> Result<PrimaryTarget, VisionError> {
        let largest = self.detector.find_largest(mask, budget)?;
        Ok(match largest {
            Some(blob) if blob.pixel_count >= self.detector.min_area() => {
                PrimaryTarget::from_blob(blob, mask.width() as u32)
            }
            _ => PrimaryTarget::default(),
        })
    }

    /// Ranked candidates, deduplicated by centroid column.
    pub fn secondary_from_mask(&self, mask: &Mask, budget: &HeapBudget) -> Result<SecondaryTargets, VisionError> {
        let candidates = self
            .detector
            .find_top_k(mask, self.raw_secondary_candidates, budget)?;
        let accepted = select_distinct(candidates, self.min_separation, MAX_SECONDARY);
        Ok(SecondaryTargets::from_blobs(accepted, mask.width() as u32))
    }
}

/// Greedy pass over `candidates` in order: a candidate is kept when its centroid
/// column is at least `min_separation` pixels from every centroid column kept so
/// far. Consumers only see horizontal offsets, so rows do not count.
pub fn select_distinct(candidates: Vec<BlobInfo>, min_separation: u32, max: usize) -> Vec<BlobInfo> {
    let mut accepted: Vec<BlobInfo> = Vec::with_capacity(max);

    for candidate in candidates {
        if accepted.len() == max {
            break;
        }
        match accepted
            .iter()
            .find(|kept| kept.centroid_dx(&candidate) < min_separation)
        {
            Some(kept) => debug!(
                "Dropping duplicate blob (area {}, centroid {:?}) near accepted centroid {:?}",
                candidate.pixel_count,
                candidate.centroid(),
                kept.centroid()
            ),
            None => accepted.push(candidate),
        }
    }

    accepted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::pixel::pixel::Pixel;

    const YELLOW: Pixel = Pixel::new(255, 255, 0);
    const PINK: Pixel = Pixel::new(255, 0, 160);

    fn pipeline() -> FramePipeline {
        FramePipeline::new(&VisionConfig::default())
    }

    fn mask(rects: &[(usize, usize, usize, usize)]) -> Mask {
        let mut mask = Mask::new(160, 120, &HeapBudget::unlimited()).unwrap();
        for &(x, y, w, h) in rects {
            mask.fill_rect(x, y, w, h);
        }
        mask
    }

    fn painted(rects: &[(u32, u32, u32, u32, Pixel)]) -> Frame {
        Frame::from_fn(160, 120, 0, |x, y| {
            rects
                .iter()
                .find(|&&(rx, ry, w, h, _)| x >= rx && x < rx + w && y >= ry && y < ry + h)
                .map(|&(.., color)| color)
                .unwrap_or_default()
        })
    }

    fn blob(x: u32, y: u32, area: u32) -> BlobInfo {
        let mut blob = BlobInfo::seed(0);
        for _ in 0..area {
            blob.add_pixel(x, y);
        }
        blob
    }

    #[test]
    fn primary_centered_square() {
        let target = pipeline()
            .primary_from_mask(&mask(&[(76, 56, 10, 10)]), &HeapBudget::unlimited())
            .unwrap();
        assert!(target.found);
        assert_eq!(target.area, 100);
        assert_eq!(target.offset_x, 0);
    }

    #[test]
    fn primary_below_min_area_is_not_found() {
        let target = pipeline()
            .primary_from_mask(&mask(&[(10, 10, 1, 3)]), &HeapBudget::unlimited())
            .unwrap();
        assert_eq!(target, PrimaryTarget::default());
    }

    #[test]
    fn secondary_two_separated_blobs() {
        let targets = pipeline()
            .secondary_from_mask(
                &mask(&[(38, 50, 6, 5), (138, 50, 5, 5)]),
                &HeapBudget::unlimited(),
            )
            .unwrap();
        assert_eq!(targets.count, 2);
        assert_eq!(targets.area, [30, 25]);
        assert_eq!(targets.offset_x, [-40, 60]);
    }

    #[test]
    fn secondary_close_blobs_are_deduplicated() {
        // Centroids at x = 59 and x = 67.
        let targets = pipeline()
            .secondary_from_mask(
                &mask(&[(58, 50, 4, 4), (66, 50, 3, 3)]),
                &HeapBudget::unlimited(),
            )
            .unwrap();
        assert_eq!(targets.count, 1);
        assert_eq!(targets.area, [16, 0]);
        assert_eq!(targets.offset_x, [-21, 0]);
    }

    #[test]
    fn select_distinct_is_greedy_against_accepted_only() {
        // B is close to A and dropped; C is close to B but far from A and kept.
        let a = blob(10, 10, 9);
        let b = blob(25, 10, 8);
        let c = blob(40, 10, 7);
        let kept = select_distinct(vec![a.clone(), b, c.clone()], 20, 2);
        assert_eq!(kept, vec![a, c]);
    }

    #[test]
    fn select_distinct_compares_columns_only() {
        // Same column, 30 px apart vertically: one bearing, one detection.
        let kept = select_distinct(vec![blob(50, 10, 9), blob(50, 40, 8)], 20, 2);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].pixel_count, 9);
        // 15 px across and 15 px down is still under the column threshold.
        let kept = select_distinct(vec![blob(50, 10, 9), blob(65, 25, 8)], 20, 2);
        assert_eq!(kept.len(), 1);
        // Exactly at the threshold counts as distinct, whatever the rows.
        let kept = select_distinct(vec![blob(50, 10, 9), blob(70, 90, 8)], 20, 2);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn select_distinct_stops_at_max() {
        let kept = select_distinct(
            vec![blob(0, 0, 5), blob(50, 0, 5), blob(100, 0, 5)],
            20,
            MAX_SECONDARY,
        );
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn process_finds_both_colors() {
        let frame = painted(&[(70, 50, 8, 8, YELLOW), (20, 20, 5, 5, PINK), (120, 20, 4, 4, PINK)]);
        let (primary, secondary, _, outcome) = pipeline()
            .process(&frame, &HeapBudget::unlimited())
            .into_outcome();
        assert!(outcome.is_complete());
        assert!(primary.found);
        assert_eq!(primary.area, 64);
        assert_eq!(primary.offset_x, -7);
        assert_eq!(secondary.count, 2);
        assert_eq!(secondary.area, [25, 16]);
    }

    #[test]
    fn colors_do_not_leak_into_each_other() {
        let frame = painted(&[(70, 50, 8, 8, PINK)]);
        let analysis = pipeline().process(&frame, &HeapBudget::unlimited());
        assert!(!analysis.primary.found);
        assert_eq!(analysis.secondary.count, 1);
    }

    #[test]
    fn allocation_failure_degrades_the_color() {
        let frame = painted(&[(70, 50, 8, 8, YELLOW)]);
        let budget = HeapBudget::with_limit(100);
        let analysis = pipeline().process(&frame, &budget);
        assert!(analysis.primary.degraded);
        assert!(!analysis.primary.found);
        assert!(analysis.secondary.degraded);
        assert_eq!(analysis.failures.len(), 2);
        assert!(analysis.failures.iter().all(|f| f.error.is_allocation()));
        assert_eq!(budget.in_use(), 0);

        let (.., outcome) = analysis.into_outcome();
        assert!(!outcome.is_complete());
        assert_eq!(outcome.failures()[0].role, TargetRole::Primary);
    }

    #[test]
    fn secondary_still_reported_when_primary_fails() {
        let frame = painted(&[(70, 50, 8, 8, YELLOW), (20, 20, 5, 5, PINK), (120, 20, 4, 4, PINK)]);
        // Lease 0 is the primary mask.
        let budget = HeapBudget::refusing_lease(0);
        let analysis = pipeline().process(&frame, &budget);

        assert!(analysis.primary.degraded);
        assert!(!analysis.primary.found);
        assert!(!analysis.secondary.degraded);
        assert_eq!(analysis.secondary.count, 2);
        assert_eq!(analysis.secondary.area, [25, 16]);
        assert_eq!(analysis.failures.len(), 1);
        assert_eq!(analysis.failures[0].role, TargetRole::Primary);
        assert_eq!(budget.in_use(), 0);
    }

    #[test]
    fn primary_still_reported_when_secondary_fails() {
        let frame = painted(&[(70, 50, 8, 8, YELLOW), (20, 20, 5, 5, PINK)]);
        // The primary takes leases 0..=3 (mask, scratch, visited map, stack).
        let budget = HeapBudget::refusing_lease(4);
        let analysis = pipeline().process(&frame, &budget);

        assert!(analysis.primary.found);
        assert_eq!(analysis.primary.area, 64);
        assert!(analysis.secondary.degraded);
        assert_eq!(analysis.secondary.count, 0);
        assert_eq!(analysis.failures.len(), 1);
        assert_eq!(analysis.failures[0].role, TargetRole::Secondary);
        assert_eq!(budget.in_use(), 0);
    }

    #[test]
    fn buffers_are_released_after_process() {
        let budget = HeapBudget::unlimited();
        let frame = painted(&[(70, 50, 8, 8, YELLOW)]);
        pipeline().process(&frame, &budget);
        assert_eq!(budget.in_use(), 0);
        assert!(budget.peak() > 0);
    }
}
