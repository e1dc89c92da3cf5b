// THEORY:
// Morphological closing over a binary mask: expand (max over a square neighbourhood)
// then shrink (min over the same neighbourhood). Expanding bridges small gaps
// between fragments of one marker; shrinking removes the growth again, so the
// region returns to roughly its original size while keeping the new bridges.
//
// Neighbourhoods are clamped to the frame: pixels outside the image are simply not
// part of the window (no wrap, no padding value).
//
// Closing needs one scratch plane the size of the mask. If that plane cannot be
// leased the mask is left exactly as it was and the error is returned; a half-closed
// mask is never handed to the extractor.

use crate::core_modules::mask::Mask;
use crate::error::VisionError;
use crate::memory::HeapBudget;

/// Expand: each output pixel is the maximum over its clamped neighbourhood.
pub fn dilate(input: &[u8], output: &mut [u8], width: usize, height: usize, radius: usize) {
    sweep(input, output, width, height, radius, u8::MIN, u8::max);
}

/// Shrink: each output pixel is the minimum over its clamped neighbourhood.
pub fn erode(input: &[u8], output: &mut [u8], width: usize, height: usize, radius: usize) {
    sweep(input, output, width, height, radius, u8::MAX, u8::min);
}

fn sweep(
    input: &[u8],
    output: &mut [u8],
    width: usize,
    height: usize,
    radius: usize,
    identity: u8,
    pick: fn(u8, u8) -> u8,
) {
    debug_assert_eq!(input.len(), width * height);
    debug_assert_eq!(output.len(), width * height);

    for y in 0..height {
        let y_lo = y.saturating_sub(radius);
        let y_hi = (y + radius).min(height - 1);
        for x in 0..width {
            let x_lo = x.saturating_sub(radius);
            let x_hi = (x + radius).min(width - 1);

            let mut acc = identity;
            for ny in y_lo..=y_hi {
                let row = &input[ny * width + x_lo..=ny * width + x_hi];
                acc = row.iter().fold(acc, |a, &v| pick(a, v));
            }
            output[y * width + x] = acc;
        }
    }
}

/// Closes `mask` in place with a `(2 * radius + 1)` square structuring element.
pub fn close(mask: &mut Mask, radius: usize, budget: &HeapBudget) -> Result<(), VisionError> {
    if radius == 0 || mask.is_empty() {
        return Ok(());
    }

    let (width, height) = (mask.width(), mask.height());
    let mut scratch = budget.filled("morphology scratch", mask.len(), Mask::BACKGROUND)?;

    // Fills gaps.
    dilate(mask.as_slice(), &mut scratch, width, height, radius);
    // Removes the growth, keeps the bridges.
    erode(&scratch, mask.as_mut_slice(), width, height, radius);

    Ok(())
}
