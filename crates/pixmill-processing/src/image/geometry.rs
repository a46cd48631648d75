//! Resize, crop, rotate, flip and thumbnail

use crate::buffer::PixelBuffer;
use crate::color::Color;
use crate::error::{ProcessingError, ProcessingResult};
use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Mirror axis for [`flip`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlipDirection {
    /// Mirror columns (left/right)
    #[default]
    #[serde(alias = "h")]
    Horizontal,
    /// Mirror rows (top/bottom)
    #[serde(alias = "v")]
    Vertical,
}

impl FromStr for FlipDirection {
    type Err = ProcessingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "h" | "horizontal" => Ok(FlipDirection::Horizontal),
            "v" | "vertical" => Ok(FlipDirection::Vertical),
            other => Err(ProcessingError::invalid(format!(
                "Invalid flip direction: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for FlipDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlipDirection::Horizontal => f.write_str("horizontal"),
            FlipDirection::Vertical => f.write_str("vertical"),
        }
    }
}

/// Select resampling filter based on how far the image is scaled
pub fn select_filter(src_width: u32, src_height: u32, dst_width: u32, dst_height: u32) -> FilterType {
    let scale_x = dst_width as f64 / src_width as f64;
    let scale_y = dst_height as f64 / src_height as f64;
    let scale = scale_x.min(scale_y);

    if scale >= 0.5 {
        FilterType::Lanczos3
    } else if scale >= 0.25 {
        FilterType::CatmullRom
    } else {
        FilterType::Triangle
    }
}

/// Largest box no bigger than (width, height) with the source aspect ratio
pub fn fit_dimensions(src_width: u32, src_height: u32, width: u32, height: u32) -> (u32, u32) {
    let scale = (width as f64 / src_width as f64).min(height as f64 / src_height as f64);
    let w = ((src_width as f64 * scale).round() as u32).clamp(1, width);
    let h = ((src_height as f64 * scale).round() as u32).clamp(1, height);
    (w, h)
}

fn resize_exact(img: &RgbaImage, width: u32, height: u32) -> RgbaImage {
    let (src_w, src_h) = img.dimensions();
    if (src_w, src_h) == (width, height) {
        return img.clone();
    }
    let filter = select_filter(src_w, src_h, width, height);
    imageops::resize(img, width, height, filter)
}

/// Reject an output canvas with a side larger than `max_dimension`
pub fn check_dimensions(width: u32, height: u32, max_dimension: u32) -> ProcessingResult<()> {
    if width > max_dimension || height > max_dimension {
        return Err(ProcessingError::invalid(format!(
            "Output size {}x{} exceeds the maximum dimension of {}px",
            width, height, max_dimension
        )));
    }
    Ok(())
}

fn require_positive(name: &str, value: u32) -> ProcessingResult<()> {
    if value == 0 {
        return Err(ProcessingError::invalid(format!(
            "{} must be greater than 0",
            name
        )));
    }
    Ok(())
}

/// Resize to exactly (width, height), or to the largest aspect-preserving box
/// inside it when `maintain_aspect` is set.
pub fn resize(
    buf: &PixelBuffer,
    width: u32,
    height: u32,
    maintain_aspect: bool,
    max_dimension: u32,
) -> ProcessingResult<PixelBuffer> {
    require_positive("width", width)?;
    require_positive("height", height)?;

    let (target_w, target_h) = if maintain_aspect {
        fit_dimensions(buf.width(), buf.height(), width, height)
    } else {
        (width, height)
    };
    check_dimensions(target_w, target_h, max_dimension)?;

    PixelBuffer::from_image(resize_exact(buf.as_image(), target_w, target_h))
}

/// Crop an explicit box at (x, y), or a centered cover crop when no origin is given.
pub fn crop(
    buf: &PixelBuffer,
    width: u32,
    height: u32,
    x: Option<u32>,
    y: Option<u32>,
    max_dimension: u32,
) -> ProcessingResult<PixelBuffer> {
    require_positive("crop width", width)?;
    require_positive("crop height", height)?;
    check_dimensions(width, height, max_dimension)?;

    match (x, y) {
        (Some(x), Some(y)) => crop_box(buf, x, y, width, height),
        (None, None) => cover_crop(buf, width, height, max_dimension),
        _ => Err(ProcessingError::invalid(
            "crop x and y must be given together",
        )),
    }
}

fn crop_box(buf: &PixelBuffer, x: u32, y: u32, width: u32, height: u32) -> ProcessingResult<PixelBuffer> {
    let (img_w, img_h) = buf.dimensions();
    if x as u64 + width as u64 > img_w as u64 || y as u64 + height as u64 > img_h as u64 {
        return Err(ProcessingError::OutOfBounds(format!(
            "Crop box {}x{} at ({}, {}) exceeds image bounds {}x{}",
            width, height, x, y, img_w, img_h
        )));
    }

    let cropped = imageops::crop_imm(buf.as_image(), x, y, width, height).to_image();
    PixelBuffer::from_image(cropped)
}

/// Scale so the image covers (width, height), then trim the excess evenly
fn cover_crop(
    buf: &PixelBuffer,
    width: u32,
    height: u32,
    max_dimension: u32,
) -> ProcessingResult<PixelBuffer> {
    let (img_w, img_h) = buf.dimensions();
    let scale = (width as f64 / img_w as f64).max(height as f64 / img_h as f64);
    let scaled_w = ((img_w as f64 * scale).round() as u32).max(width);
    let scaled_h = ((img_h as f64 * scale).round() as u32).max(height);
    // The scaled intermediate is allocated in full before trimming
    check_dimensions(scaled_w, scaled_h, max_dimension)?;

    let scaled = resize_exact(buf.as_image(), scaled_w, scaled_h);
    let x = (scaled_w - width) / 2;
    let y = (scaled_h - height) / 2;

    let cropped = imageops::crop_imm(&scaled, x, y, width, height).to_image();
    PixelBuffer::from_image(cropped)
}

/// Rotate counter-clockwise by `angle` degrees around the center.
///
/// The canvas grows to the bounding box of the rotated image and uncovered
/// pixels are filled with the opaque `background`.
pub fn rotate(
    buf: &PixelBuffer,
    angle: f32,
    background: Color,
    max_dimension: u32,
) -> ProcessingResult<PixelBuffer> {
    if !angle.is_finite() {
        return Err(ProcessingError::invalid(format!(
            "Rotation angle must be finite, got {}",
            angle
        )));
    }

    let normalized = (angle as f64).rem_euclid(360.0);
    if normalized == 0.0 {
        return Ok(buf.clone());
    }

    let img = buf.as_image();

    // Right angles are exact pixel moves
    let rotated = if normalized == 90.0 {
        imageops::rotate270(img)
    } else if normalized == 180.0 {
        imageops::rotate180(img)
    } else if normalized == 270.0 {
        imageops::rotate90(img)
    } else {
        let (out_w, out_h) = rotated_canvas(img.width(), img.height(), normalized);
        check_dimensions(out_w, out_h, max_dimension)?;
        rotate_bilinear(img, normalized, (out_w, out_h), background.opaque())
    };

    PixelBuffer::from_image(rotated)
}

/// Bounding box of a `width`x`height` rectangle rotated by `degrees`
fn rotated_canvas(width: u32, height: u32, degrees: f64) -> (u32, u32) {
    let (src_w, src_h) = (width as f64, height as f64);
    let (sin, cos) = degrees.to_radians().sin_cos();

    // Tolerance keeps float noise from adding a pixel to the canvas
    let out_w = ((src_w * cos.abs() + src_h * sin.abs()) - 1e-6).ceil().max(1.0) as u32;
    let out_h = ((src_w * sin.abs() + src_h * cos.abs()) - 1e-6).ceil().max(1.0) as u32;
    (out_w, out_h)
}

fn rotate_bilinear(
    img: &RgbaImage,
    degrees: f64,
    (out_w, out_h): (u32, u32),
    background: Color,
) -> RgbaImage {
    let (src_w, src_h) = (img.width() as f64, img.height() as f64);
    let (sin, cos) = degrees.to_radians().sin_cos();

    let (src_cx, src_cy) = (src_w / 2.0, src_h / 2.0);
    let (out_cx, out_cy) = (out_w as f64 / 2.0, out_h as f64 / 2.0);
    let bg = background.to_rgba();

    RgbaImage::from_fn(out_w, out_h, |ox, oy| {
        let dx = ox as f64 + 0.5 - out_cx;
        let dy = oy as f64 + 0.5 - out_cy;

        // Inverse of a counter-clockwise rotation in y-down coordinates
        let sx = dx * cos - dy * sin + src_cx - 0.5;
        let sy = dx * sin + dy * cos + src_cy - 0.5;

        Rgba(sample_bilinear(img, sx, sy, bg))
    })
}

fn sample_bilinear(img: &RgbaImage, x: f64, y: f64, bg: [u8; 4]) -> [u8; 4] {
    let (w, h) = (img.width() as i64, img.height() as i64);
    if x <= -1.0 || y <= -1.0 || x >= w as f64 || y >= h as f64 {
        return bg;
    }

    let x0 = x.floor() as i64;
    let y0 = y.floor() as i64;
    let fx = x - x0 as f64;
    let fy = y - y0 as f64;

    let fetch = |px: i64, py: i64| -> [u8; 4] {
        if px < 0 || py < 0 || px >= w || py >= h {
            bg
        } else {
            img.get_pixel(px as u32, py as u32).0
        }
    };

    let p00 = fetch(x0, y0);
    let p10 = fetch(x0 + 1, y0);
    let p01 = fetch(x0, y0 + 1);
    let p11 = fetch(x0 + 1, y0 + 1);

    let mut out = [0u8; 4];
    for c in 0..4 {
        let top = p00[c] as f64 * (1.0 - fx) + p10[c] as f64 * fx;
        let bottom = p01[c] as f64 * (1.0 - fx) + p11[c] as f64 * fx;
        out[c] = (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8;
    }
    out
}

pub fn flip(buf: &PixelBuffer, direction: FlipDirection) -> ProcessingResult<PixelBuffer> {
    let flipped = match direction {
        FlipDirection::Horizontal => imageops::flip_horizontal(buf.as_image()),
        FlipDirection::Vertical => imageops::flip_vertical(buf.as_image()),
    };
    PixelBuffer::from_image(flipped)
}

/// Fit inside a `size`x`size` square and center on a white canvas
pub fn thumbnail(buf: &PixelBuffer, size: u32, max_dimension: u32) -> ProcessingResult<PixelBuffer> {
    require_positive("thumbnail size", size)?;
    check_dimensions(size, size, max_dimension)?;

    let fitted = resize(buf, size, size, true, max_dimension)?;
    let mut canvas = RgbaImage::from_pixel(size, size, Rgba(Color::WHITE.to_rgba()));
    let x = (size - fitted.width()) / 2;
    let y = (size - fitted.height()) / 2;
    imageops::overlay(&mut canvas, fitted.as_image(), x as i64, y as i64);

    PixelBuffer::from_image(canvas)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX: u32 = 16_384;

    fn gradient(width: u32, height: u32) -> PixelBuffer {
        let img = RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x * 11 % 256) as u8, (y * 17 % 256) as u8, ((x + y) % 256) as u8, 255])
        });
        PixelBuffer::from_image(img).unwrap()
    }

    #[test]
    fn test_resize_maintain_aspect_fits_box() {
        let buf = gradient(200, 100);
        let resized = resize(&buf, 100, 100, true, MAX).unwrap();
        assert_eq!(resized.dimensions(), (100, 50));

        let resized = resize(&buf, 300, 30, true, MAX).unwrap();
        assert_eq!(resized.dimensions(), (60, 30));
    }

    #[test]
    fn test_resize_exact() {
        let buf = gradient(200, 100);
        let resized = resize(&buf, 37, 91, false, MAX).unwrap();
        assert_eq!(resized.dimensions(), (37, 91));
    }

    #[test]
    fn test_resize_zero_rejected() {
        let buf = gradient(10, 10);
        assert!(matches!(
            resize(&buf, 0, 10, true, MAX),
            Err(ProcessingError::InvalidParameter(_))
        ));
        assert!(matches!(
            resize(&buf, 10, 0, false, MAX),
            Err(ProcessingError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_fit_dimensions_never_zero() {
        assert_eq!(fit_dimensions(10_000, 1, 100, 100), (100, 1));
        assert_eq!(fit_dimensions(1, 10_000, 100, 100), (1, 100));
    }

    #[test]
    fn test_select_filter() {
        assert_eq!(select_filter(100, 100, 90, 90), FilterType::Lanczos3);
        assert_eq!(select_filter(100, 100, 30, 30), FilterType::CatmullRom);
        assert_eq!(select_filter(1000, 1000, 100, 100), FilterType::Triangle);
    }

    #[test]
    fn test_crop_explicit() {
        let buf = gradient(50, 40);
        let cropped = crop(&buf, 20, 10, Some(5), Some(7), MAX).unwrap();
        assert_eq!(cropped.dimensions(), (20, 10));
        assert_eq!(cropped.pixel(0, 0), buf.pixel(5, 7));
        assert_eq!(cropped.pixel(19, 9), buf.pixel(24, 16));
    }

    #[test]
    fn test_crop_out_of_bounds() {
        let buf = gradient(50, 40);
        assert!(matches!(
            crop(&buf, 20, 10, Some(40), Some(0), MAX),
            Err(ProcessingError::OutOfBounds(_))
        ));
        assert!(matches!(
            crop(&buf, 60, 10, Some(0), Some(0), MAX),
            Err(ProcessingError::OutOfBounds(_))
        ));
        // Box touching the edge is allowed
        assert!(crop(&buf, 10, 10, Some(40), Some(30), MAX).is_ok());
    }

    #[test]
    fn test_crop_requires_both_coordinates() {
        let buf = gradient(50, 40);
        assert!(matches!(
            crop(&buf, 10, 10, Some(1), None, MAX),
            Err(ProcessingError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_cover_crop() {
        let buf = gradient(200, 100);
        assert_eq!(crop(&buf, 50, 50, None, None, MAX).unwrap().dimensions(), (50, 50));
        assert_eq!(crop(&buf, 300, 30, None, None, MAX).unwrap().dimensions(), (300, 30));
        assert_eq!(crop(&buf, 7, 199, None, None, MAX).unwrap().dimensions(), (7, 199));
    }

    #[test]
    fn test_rotate_full_turn_is_identity() {
        let buf = gradient(31, 17);
        assert_eq!(rotate(&buf, 0.0, Color::WHITE, MAX).unwrap(), buf);
        assert_eq!(rotate(&buf, 360.0, Color::WHITE, MAX).unwrap(), buf);
        assert_eq!(rotate(&buf, -720.0, Color::WHITE, MAX).unwrap(), buf);
    }

    #[test]
    fn test_rotate_right_angles() {
        let mut img = RgbaImage::from_pixel(4, 2, Rgba([0, 0, 0, 255]));
        img.put_pixel(3, 0, Rgba([255, 0, 0, 255]));
        let buf = PixelBuffer::from_image(img).unwrap();

        // Counter-clockwise: the top-right corner moves to the top-left
        let rotated = rotate(&buf, 90.0, Color::WHITE, MAX).unwrap();
        assert_eq!(rotated.dimensions(), (2, 4));
        assert_eq!(rotated.pixel(0, 0), Some([255, 0, 0, 255]));

        let rotated = rotate(&buf, 180.0, Color::WHITE, MAX).unwrap();
        assert_eq!(rotated.dimensions(), (4, 2));
        assert_eq!(rotated.pixel(0, 1), Some([255, 0, 0, 255]));

        // -90 is a clockwise quarter turn
        let rotated = rotate(&buf, -90.0, Color::WHITE, MAX).unwrap();
        assert_eq!(rotated.dimensions(), (2, 4));
        assert_eq!(rotated.pixel(1, 3), Some([255, 0, 0, 255]));

        let four_quarters = (0..4).try_fold(buf.clone(), |b, _| rotate(&b, 90.0, Color::WHITE, MAX));
        assert_eq!(four_quarters.unwrap(), buf);
    }

    #[test]
    fn test_rotate_arbitrary_angle_expands_canvas() {
        let buf = PixelBuffer::new(10, 10, [0, 0, 255, 255]).unwrap();
        let rotated = rotate(&buf, 45.0, Color::rgb(255, 0, 0), MAX).unwrap();
        assert_eq!(rotated.dimensions(), (15, 15));
        // Corner is uncovered and filled with the background
        assert_eq!(rotated.pixel(0, 0), Some([255, 0, 0, 255]));
        // Center still comes from the source
        assert_eq!(rotated.pixel(7, 7), Some([0, 0, 255, 255]));
    }

    #[test]
    fn test_rotate_rejects_nan() {
        let buf = gradient(4, 4);
        assert!(rotate(&buf, f32::NAN, Color::WHITE, MAX).is_err());
    }

    #[test]
    fn test_flip_twice_is_identity() {
        let buf = gradient(13, 7);
        for direction in [FlipDirection::Horizontal, FlipDirection::Vertical] {
            let once = flip(&buf, direction).unwrap();
            assert_ne!(once, buf);
            assert_eq!(flip(&once, direction).unwrap(), buf);
        }
    }

    #[test]
    fn test_flip_direction_parse() {
        assert_eq!("h".parse::<FlipDirection>().unwrap(), FlipDirection::Horizontal);
        assert_eq!("Vertical".parse::<FlipDirection>().unwrap(), FlipDirection::Vertical);
        assert!(matches!(
            "diagonal".parse::<FlipDirection>(),
            Err(ProcessingError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_thumbnail_pads_to_square() {
        let buf = PixelBuffer::new(200, 100, [255, 0, 0, 255]).unwrap();
        let thumb = thumbnail(&buf, 150, MAX).unwrap();
        assert_eq!(thumb.dimensions(), (150, 150));
        // Padding above the letterboxed image is white
        assert_eq!(thumb.pixel(75, 5), Some([255, 255, 255, 255]));
        let [r, g, b, _] = thumb.pixel(75, 75).unwrap();
        assert!(r > 250 && g < 5 && b < 5);

        assert!(thumbnail(&buf, 0, MAX).is_err());
    }

    #[test]
    fn test_output_size_limit() {
        let buf = gradient(10, 10);
        assert!(matches!(
            resize(&buf, 200_000, 200_000, false, MAX),
            Err(ProcessingError::InvalidParameter(_))
        ));
        assert!(resize(&buf, 64, 64, false, 64).is_ok());
        assert!(resize(&buf, 65, 64, false, 64).is_err());

        assert!(matches!(
            thumbnail(&buf, 100_000, MAX),
            Err(ProcessingError::InvalidParameter(_))
        ));
        assert!(crop(&buf, 100, 100, None, None, 50).is_err());
    }

    #[test]
    fn test_cover_crop_intermediate_is_limited() {
        // Covering 300x30 from 1x10000 would scale through 300x3000000
        let buf = PixelBuffer::new(1, 10_000, [0, 0, 0, 255]).unwrap();
        assert!(matches!(
            crop(&buf, 300, 30, None, None, MAX),
            Err(ProcessingError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_rotated_canvas_is_limited() {
        let buf = gradient(100, 100);
        // 45 degrees grows the canvas to 142x142
        assert!(rotate(&buf, 45.0, Color::WHITE, 141).is_err());
        assert!(rotate(&buf, 45.0, Color::WHITE, 142).is_ok());
        // Right angles keep the same sides
        assert!(rotate(&buf, 90.0, Color::WHITE, 100).is_ok());
    }
}
