//! Watermark overlay and text rendering

use crate::buffer::PixelBuffer;
use crate::color::Color;
use crate::error::{ProcessingError, ProcessingResult};
use ab_glyph::{FontVec, PxScale};
use font8x8::{UnicodeFonts, BASIC_FONTS};
use image::{imageops, Pixel, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Glyph cell size of the built-in bitmap font
const BITMAP_GLYPH_SIZE: u32 = 8;

/// Largest text size in pixels
pub const MAX_TEXT_SIZE: u32 = 1024;

/// Text size must be in `1..=MAX_TEXT_SIZE`
pub fn check_text_size(size: u32) -> ProcessingResult<()> {
    if size == 0 || size > MAX_TEXT_SIZE {
        return Err(ProcessingError::invalid(format!(
            "Text size must be between 1 and {}, got {}",
            MAX_TEXT_SIZE, size
        )));
    }
    Ok(())
}

/// Anchor the overlay is placed against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Anchor {
    TopLeft,
    Top,
    TopRight,
    Left,
    Center,
    Right,
    BottomLeft,
    Bottom,
    #[default]
    BottomRight,
}

impl Anchor {
    pub fn as_str(self) -> &'static str {
        match self {
            Anchor::TopLeft => "top-left",
            Anchor::Top => "top",
            Anchor::TopRight => "top-right",
            Anchor::Left => "left",
            Anchor::Center => "center",
            Anchor::Right => "right",
            Anchor::BottomLeft => "bottom-left",
            Anchor::Bottom => "bottom",
            Anchor::BottomRight => "bottom-right",
        }
    }

    /// Top-left corner of an overlay of size (w, h) on a base of size (base_w, base_h).
    /// Offsets push the overlay inward from the anchored edge.
    fn origin(self, base: (u32, u32), overlay: (u32, u32), offset_x: i32, offset_y: i32) -> (i64, i64) {
        let (base_w, base_h) = (base.0 as i64, base.1 as i64);
        let (w, h) = (overlay.0 as i64, overlay.1 as i64);
        let (dx, dy) = (offset_x as i64, offset_y as i64);

        let left = dx;
        let center_x = (base_w - w) / 2 + dx;
        let right = base_w - w - dx;
        let top = dy;
        let center_y = (base_h - h) / 2 + dy;
        let bottom = base_h - h - dy;

        match self {
            Anchor::TopLeft => (left, top),
            Anchor::Top => (center_x, top),
            Anchor::TopRight => (right, top),
            Anchor::Left => (left, center_y),
            Anchor::Center => (center_x, center_y),
            Anchor::Right => (right, center_y),
            Anchor::BottomLeft => (left, bottom),
            Anchor::Bottom => (center_x, bottom),
            Anchor::BottomRight => (right, bottom),
        }
    }
}

impl FromStr for Anchor {
    type Err = ProcessingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "top-left" => Ok(Anchor::TopLeft),
            "top" => Ok(Anchor::Top),
            "top-right" => Ok(Anchor::TopRight),
            "left" => Ok(Anchor::Left),
            "center" => Ok(Anchor::Center),
            "right" => Ok(Anchor::Right),
            "bottom-left" => Ok(Anchor::BottomLeft),
            "bottom" => Ok(Anchor::Bottom),
            "bottom-right" => Ok(Anchor::BottomRight),
            other => Err(ProcessingError::invalid(format!(
                "Invalid watermark position: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Alpha-composite `overlay` onto `base` at an anchored position.
///
/// An overlay partially outside the base is clipped; one entirely outside
/// fails with `OutOfBounds`.
pub fn watermark(
    base: &mut PixelBuffer,
    overlay: &PixelBuffer,
    position: Anchor,
    offset_x: i32,
    offset_y: i32,
    opacity: u8,
) -> ProcessingResult<()> {
    if opacity > 100 {
        return Err(ProcessingError::invalid(format!(
            "Watermark opacity must be between 0 and 100, got {}",
            opacity
        )));
    }

    let (base_w, base_h) = base.dimensions();
    let (wm_w, wm_h) = overlay.dimensions();
    let (x, y) = position.origin((base_w, base_h), (wm_w, wm_h), offset_x, offset_y);

    if x >= base_w as i64 || y >= base_h as i64 || x + wm_w as i64 <= 0 || y + wm_h as i64 <= 0 {
        return Err(ProcessingError::OutOfBounds(format!(
            "Watermark {}x{} at ({}, {}) lies entirely outside the {}x{} image",
            wm_w, wm_h, x, y, base_w, base_h
        )));
    }

    tracing::debug!(
        position = %position,
        x = x,
        y = y,
        opacity = opacity,
        "Applying watermark"
    );

    if opacity < 100 {
        let mut faded: RgbaImage = overlay.as_image().clone();
        for pixel in faded.pixels_mut() {
            pixel[3] = ((pixel[3] as u32 * opacity as u32 + 50) / 100) as u8;
        }
        imageops::overlay(base.as_image_mut(), &faded, x, y);
    } else {
        imageops::overlay(base.as_image_mut(), overlay.as_image(), x, y);
    }

    Ok(())
}

/// Load a TrueType/OpenType font from disk
pub fn load_font(path: &Path) -> ProcessingResult<FontVec> {
    let data = std::fs::read(path).map_err(|e| {
        ProcessingError::FontNotFound(format!("{}: {}", path.display(), e))
    })?;
    FontVec::try_from_vec(data).map_err(|_| {
        ProcessingError::FontNotFound(format!("{}: not a valid font file", path.display()))
    })
}

/// Draw `text` with its top-left corner at (x, y).
///
/// Uses the font at `font_path` rendered at `size` pixels, or the built-in 8x8
/// bitmap font scaled by `size / 8` when no font is given.
pub fn text(
    buf: &mut PixelBuffer,
    text: &str,
    x: i32,
    y: i32,
    size: u32,
    color: Color,
    font_path: Option<&Path>,
) -> ProcessingResult<()> {
    check_text_size(size)?;

    match font_path {
        Some(path) => {
            let font = load_font(path)?;
            imageproc::drawing::draw_text_mut(
                buf.as_image_mut(),
                Rgba(color.to_rgba()),
                x,
                y,
                PxScale::from(size as f32),
                &font,
                text,
            );
        }
        None => draw_bitmap_text(buf.as_image_mut(), text, x, y, size, color),
    }

    Ok(())
}

fn draw_bitmap_text(img: &mut RgbaImage, text: &str, x: i32, y: i32, size: u32, color: Color) {
    let scale = (size / BITMAP_GLYPH_SIZE).max(1) as i64;
    let cell = BITMAP_GLYPH_SIZE as i64 * scale;
    let (width, height) = (img.width() as i64, img.height() as i64);
    let paint = Rgba(color.to_rgba());

    let mut cursor_x = x as i64;
    let mut cursor_y = y as i64;

    for ch in text.chars() {
        if ch == '\n' {
            cursor_x = x as i64;
            cursor_y += cell;
            continue;
        }

        let Some(glyph) = BASIC_FONTS.get(ch).or_else(|| BASIC_FONTS.get('?')) else {
            cursor_x += cell;
            continue;
        };

        let visible = cursor_x < width
            && cursor_y < height
            && cursor_x + cell > 0
            && cursor_y + cell > 0;
        if !visible {
            cursor_x += cell;
            continue;
        }

        for (row, bits) in glyph.iter().enumerate() {
            let base_y = cursor_y + row as i64 * scale;
            let rows = base_y.max(0)..(base_y + scale).min(height);
            if rows.is_empty() {
                continue;
            }
            for col in 0..BITMAP_GLYPH_SIZE as i64 {
                if (bits >> col) & 1 == 0 {
                    continue;
                }
                let base_x = cursor_x + col * scale;
                let cols = base_x.max(0)..(base_x + scale).min(width);
                for py in rows.clone() {
                    for px in cols.clone() {
                        img.get_pixel_mut(px as u32, py as u32).blend(&paint);
                    }
                }
            }
        }

        cursor_x += cell;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn white(width: u32, height: u32) -> PixelBuffer {
        PixelBuffer::new(width, height, [255, 255, 255, 255]).unwrap()
    }

    fn black_square(size: u32) -> PixelBuffer {
        PixelBuffer::new(size, size, [0, 0, 0, 255]).unwrap()
    }

    fn dark_pixels(buf: &PixelBuffer) -> usize {
        buf.as_image().pixels().filter(|p| p[0] < 128).count()
    }

    #[test]
    fn test_watermark_bottom_right_with_offsets() {
        let mut base = white(200, 200);
        watermark(&mut base, &black_square(50), Anchor::BottomRight, 10, 10, 100).unwrap();

        assert_eq!(base.pixel(140, 140), Some([0, 0, 0, 255]));
        assert_eq!(base.pixel(189, 189), Some([0, 0, 0, 255]));
        assert_eq!(base.pixel(190, 190), Some([255, 255, 255, 255]));
        assert_eq!(base.pixel(139, 139), Some([255, 255, 255, 255]));
    }

    #[test]
    fn test_watermark_center() {
        let mut base = white(100, 100);
        watermark(&mut base, &black_square(10), Anchor::Center, 0, 0, 100).unwrap();
        assert_eq!(base.pixel(45, 45), Some([0, 0, 0, 255]));
        assert_eq!(base.pixel(54, 54), Some([0, 0, 0, 255]));
        assert_eq!(dark_pixels(&base), 100);
    }

    #[test]
    fn test_watermark_opacity() {
        let mut base = white(20, 20);
        watermark(&mut base, &black_square(10), Anchor::TopLeft, 0, 0, 50).unwrap();
        let [r, _, _, a] = base.pixel(5, 5).unwrap();
        assert!((120..=135).contains(&r), "half-transparent black over white, got {}", r);
        assert_eq!(a, 255);

        assert!(matches!(
            watermark(&mut base, &black_square(10), Anchor::TopLeft, 0, 0, 101),
            Err(ProcessingError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_watermark_partially_outside_is_clipped() {
        let mut base = white(100, 100);
        watermark(&mut base, &black_square(50), Anchor::TopLeft, -25, -25, 100).unwrap();
        assert_eq!(dark_pixels(&base), 25 * 25);
    }

    #[test]
    fn test_watermark_entirely_outside_fails() {
        let mut base = white(100, 100);
        let err = watermark(&mut base, &black_square(20), Anchor::TopLeft, 150, 0, 100).unwrap_err();
        assert!(matches!(err, ProcessingError::OutOfBounds(_)));

        let err = watermark(&mut base, &black_square(20), Anchor::BottomRight, 0, 120, 100).unwrap_err();
        assert!(matches!(err, ProcessingError::OutOfBounds(_)));

        // Base is untouched on failure
        assert_eq!(dark_pixels(&base), 0);
    }

    #[test]
    fn test_anchor_parse_and_serde() {
        assert_eq!("bottom-right".parse::<Anchor>().unwrap(), Anchor::BottomRight);
        assert_eq!("TOP_LEFT".parse::<Anchor>().unwrap(), Anchor::TopLeft);
        assert!("middle".parse::<Anchor>().is_err());

        let anchor: Anchor = serde_json::from_str("\"top-right\"").unwrap();
        assert_eq!(anchor, Anchor::TopRight);
        assert_eq!(Anchor::default(), Anchor::BottomRight);
    }

    #[test]
    fn test_bitmap_text_draws_in_place() {
        let mut buf = white(100, 40);
        text(&mut buf, "Hi", 10, 10, 16, Color::BLACK, None).unwrap();

        let dark = dark_pixels(&buf);
        assert!(dark > 0);
        // Scale 2 glyphs: nothing left of x or above y
        for (x, y, p) in buf.as_image().enumerate_pixels() {
            if p[0] < 128 {
                assert!(x >= 10 && y >= 10 && x < 10 + 2 * 16 && y < 10 + 16);
            }
        }
    }

    #[test]
    fn test_text_clipped_at_edges() {
        let mut buf = white(10, 10);
        text(&mut buf, "WWWW", -4, 5, 8, Color::BLACK, None).unwrap();
        assert_eq!(buf.dimensions(), (10, 10));
    }

    #[test]
    fn test_text_zero_size_rejected() {
        let mut buf = white(10, 10);
        assert!(matches!(
            text(&mut buf, "x", 0, 0, 0, Color::BLACK, None),
            Err(ProcessingError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_text_missing_font() {
        let mut buf = white(10, 10);
        let err = text(
            &mut buf,
            "x",
            0,
            0,
            12,
            Color::BLACK,
            Some(Path::new("/nonexistent/font.ttf")),
        )
        .unwrap_err();
        assert!(matches!(err, ProcessingError::FontNotFound(_)));
    }

    #[test]
    fn test_text_invalid_font_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bogus.ttf");
        std::fs::write(&path, b"not a font").unwrap();

        let mut buf = white(10, 10);
        let err = text(&mut buf, "x", 0, 0, 12, Color::BLACK, Some(&path)).unwrap_err();
        assert!(matches!(err, ProcessingError::FontNotFound(_)));
    }

    #[test]
    fn test_text_size_is_capped() {
        let mut buf = white(20, 20);
        assert!(matches!(
            text(&mut buf, "A", 0, 0, 65_536, Color::BLACK, None),
            Err(ProcessingError::InvalidParameter(_))
        ));
        assert!(text(&mut buf, "A", 0, 0, MAX_TEXT_SIZE, Color::BLACK, None).is_ok());
    }

    #[test]
    fn test_text_off_canvas_leaves_image_unchanged() {
        let original = white(20, 20);
        let long_line = "W".repeat(500);
        for (x, y) in [(5_000, 0), (0, 5_000), (-1_000_000, 0), (0, -100_000)] {
            let mut buf = original.clone();
            text(&mut buf, &long_line, x, y, MAX_TEXT_SIZE, Color::BLACK, None).unwrap();
            assert_eq!(buf, original, "text at ({}, {}) touched the canvas", x, y);
        }
    }

    #[test]
    fn test_large_text_is_clipped_to_canvas() {
        let mut buf = white(10, 10);
        // One glyph cell covers 1024x1024 pixels, most of it outside the canvas
        text(&mut buf, "#", -200, -200, MAX_TEXT_SIZE, Color::BLACK, None).unwrap();
        assert_eq!(buf.dimensions(), (10, 10));
    }
}
