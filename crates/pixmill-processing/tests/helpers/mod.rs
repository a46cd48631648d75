//! Test helpers: fixture images and buffer comparisons.

pub mod fixtures;

use pixmill_processing::PixelBuffer;

/// Largest per-channel difference between two buffers of the same size.
pub fn max_channel_diff(a: &PixelBuffer, b: &PixelBuffer) -> u8 {
    assert_eq!(a.dimensions(), b.dimensions(), "buffer sizes differ");
    a.as_raw()
        .iter()
        .zip(b.as_raw())
        .map(|(x, y)| x.abs_diff(*y))
        .max()
        .unwrap_or(0)
}
