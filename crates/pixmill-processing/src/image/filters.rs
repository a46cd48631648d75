//! Color and convolution filters.
//!
//! Every filter works in place, keeps the dimensions and leaves alpha untouched.

use crate::buffer::PixelBuffer;
use crate::error::{ProcessingError, ProcessingResult};
use image::imageops;

/// Tint applied after grayscale to produce sepia
pub const SEPIA_TINT: (u8, u8, u8) = (25, 15, 5);

fn map_rgb(buf: &mut PixelBuffer, f: impl Fn(u8, u8, u8) -> [u8; 3]) {
    for pixel in buf.as_image_mut().pixels_mut() {
        let [r, g, b] = f(pixel[0], pixel[1], pixel[2]);
        pixel[0] = r;
        pixel[1] = g;
        pixel[2] = b;
    }
}

fn apply_lut(buf: &mut PixelBuffer, lut: &[u8; 256]) {
    map_rgb(buf, |r, g, b| {
        [lut[r as usize], lut[g as usize], lut[b as usize]]
    });
}

fn build_lut(f: impl Fn(f64) -> f64) -> [u8; 256] {
    let mut lut = [0u8; 256];
    for (i, entry) in lut.iter_mut().enumerate() {
        *entry = f(i as f64).round().clamp(0.0, 255.0) as u8;
    }
    lut
}

fn clamp_level(level: i32) -> f64 {
    level.clamp(-100, 100) as f64
}

/// Rec. 601 luma
pub fn grayscale(buf: &mut PixelBuffer) {
    map_rgb(buf, |r, g, b| {
        let luma = (0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64)
            .round()
            .clamp(0.0, 255.0) as u8;
        [luma, luma, luma]
    });
}

pub fn sepia(buf: &mut PixelBuffer) {
    grayscale(buf);
    let (r, g, b) = SEPIA_TINT;
    colorize(buf, r, g, b);
}

/// Shift every channel by `level * 2.55`, level clamped to [-100, 100]
pub fn brightness(buf: &mut PixelBuffer, level: i32) {
    let shift = clamp_level(level) * 255.0 / 100.0;
    apply_lut(buf, &build_lut(|v| v + shift));
}

/// Scale distance from mid-gray by `1 + level / 100`, level clamped to [-100, 100]
pub fn contrast(buf: &mut PixelBuffer, level: i32) {
    let factor = 1.0 + clamp_level(level) / 100.0;
    apply_lut(buf, &build_lut(|v| (v - 128.0) * factor + 128.0));
}

pub fn gamma(buf: &mut PixelBuffer, value: f32) -> ProcessingResult<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ProcessingError::invalid(format!(
            "Gamma must be a positive number, got {}",
            value
        )));
    }
    if value == 1.0 {
        return Ok(());
    }

    let exponent = 1.0 / value as f64;
    apply_lut(buf, &build_lut(|v| 255.0 * (v / 255.0).powf(exponent)));
    Ok(())
}

pub fn invert(buf: &mut PixelBuffer) {
    map_rgb(buf, |r, g, b| [255 - r, 255 - g, 255 - b]);
}

/// Additive tint, saturating per channel
pub fn colorize(buf: &mut PixelBuffer, r: u8, g: u8, b: u8) {
    map_rgb(buf, |pr, pg, pb| {
        [pr.saturating_add(r), pg.saturating_add(g), pb.saturating_add(b)]
    });
}

/// Gaussian blur with sigma = radius
pub fn blur(buf: &mut PixelBuffer, radius: u32) -> ProcessingResult<()> {
    if radius == 0 {
        return Err(ProcessingError::invalid("Blur radius must be greater than 0"));
    }

    let blurred = imageops::blur(buf.as_image(), radius as f32);
    let target = buf.as_image_mut();
    for (dst, src) in target.pixels_mut().zip(blurred.pixels()) {
        dst[0] = src[0];
        dst[1] = src[1];
        dst[2] = src[2];
    }
    Ok(())
}

/// 3x3 Laplacian sharpen with strength `amount / 100`
pub fn sharpen(buf: &mut PixelBuffer, amount: u32) -> ProcessingResult<()> {
    if amount == 0 {
        return Err(ProcessingError::invalid(
            "Sharpen amount must be greater than 0",
        ));
    }

    let strength = amount as f64 / 100.0;
    let source = buf.as_image().clone();
    let (width, height) = source.dimensions();
    let at = |x: i64, y: i64, c: usize| -> f64 {
        let x = x.clamp(0, width as i64 - 1) as u32;
        let y = y.clamp(0, height as i64 - 1) as u32;
        source.get_pixel(x, y)[c] as f64
    };

    for (x, y, pixel) in buf.as_image_mut().enumerate_pixels_mut() {
        let (x, y) = (x as i64, y as i64);
        for c in 0..3 {
            let center = at(x, y, c);
            let edges = 4.0 * center - at(x - 1, y, c) - at(x + 1, y, c) - at(x, y - 1, c) - at(x, y + 1, c);
            pixel[c] = (center + strength * edges).round().clamp(0.0, 255.0) as u8;
        }
    }
    Ok(())
}

/// Replace each `block_size` square with its average color
pub fn pixelate(buf: &mut PixelBuffer, block_size: u32) -> ProcessingResult<()> {
    if block_size == 0 {
        return Err(ProcessingError::invalid(
            "Pixelate block size must be greater than 0",
        ));
    }
    if block_size == 1 {
        return Ok(());
    }

    let (width, height) = buf.dimensions();
    let img = buf.as_image_mut();

    for by in (0..height).step_by(block_size as usize) {
        for bx in (0..width).step_by(block_size as usize) {
            let x_end = (bx + block_size).min(width);
            let y_end = (by + block_size).min(height);

            let mut sums = [0u64; 3];
            let mut count = 0u64;
            for y in by..y_end {
                for x in bx..x_end {
                    let p = img.get_pixel(x, y);
                    for c in 0..3 {
                        sums[c] += p[c] as u64;
                    }
                    count += 1;
                }
            }

            let avg = sums.map(|s| ((s + count / 2) / count) as u8);
            for y in by..y_end {
                for x in bx..x_end {
                    let p = img.get_pixel_mut(x, y);
                    p[0] = avg[0];
                    p[1] = avg[1];
                    p[2] = avg[2];
                }
            }
        }
    }
    Ok(())
}
