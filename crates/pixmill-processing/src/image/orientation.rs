use image::{imageops, RgbaImage};
use std::io::Cursor;

/// Read the EXIF orientation tag from encoded image data.
///
/// Returns the orientation value (1-8), or 1 (normal) when the container has no
/// EXIF block or the tag is missing or out of range.
pub fn read_exif_orientation(data: &[u8]) -> u8 {
    let exif = match exif::Reader::new().read_from_container(&mut Cursor::new(data)) {
        Ok(exif) => exif,
        Err(_) => return 1,
    };

    exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)
        .and_then(|field| field.value.get_uint(0))
        .and_then(|value| u8::try_from(value).ok())
        .filter(|value| (1..=8).contains(value))
        .unwrap_or(1)
}

/// Rotation (clockwise degrees) and flips needed to upright an EXIF orientation.
/// Returns (rotate_angle, flip_horizontal, flip_vertical); rotation is applied first.
pub fn orientation_transforms(orientation: u8) -> (Option<u16>, bool, bool) {
    match orientation {
        1 => (None, false, false),
        2 => (None, true, false),
        3 => (Some(180), false, false),
        4 => (None, false, true),
        5 => (Some(90), true, false),
        6 => (Some(90), false, false),
        7 => (Some(270), true, false),
        8 => (Some(270), false, false),
        _ => (None, false, false),
    }
}

/// Apply an EXIF orientation so the result is upright
pub fn apply_orientation(img: RgbaImage, orientation: u8) -> RgbaImage {
    let (rotate, flip_h, flip_v) = orientation_transforms(orientation);
    if rotate.is_none() && !flip_h && !flip_v {
        return img;
    }

    tracing::debug!(
        orientation = orientation,
        rotate = ?rotate,
        flip_horizontal = flip_h,
        flip_vertical = flip_v,
        "Applying EXIF orientation"
    );

    let mut img = match rotate {
        Some(90) => imageops::rotate90(&img),
        Some(180) => imageops::rotate180(&img),
        Some(270) => imageops::rotate270(&img),
        _ => img,
    };

    if flip_h {
        imageops::flip_horizontal_in_place(&mut img);
    }
    if flip_v {
        imageops::flip_vertical_in_place(&mut img);
    }

    img
}
