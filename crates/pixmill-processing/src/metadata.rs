//! Image probing without running a pipeline

use crate::codec::{decodable_format, sniff_format};
use crate::error::{ProcessingError, ProcessingResult};
use crate::format::OutputFormat;
use crate::image::orientation::read_exif_orientation;
use image::ImageReader;
use serde::{Deserialize, Serialize};
use std::io::Cursor;

/// Header-level facts about an encoded image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageInfo {
    /// Stored width, before EXIF orientation
    pub width: u32,
    /// Stored height, before EXIF orientation
    pub height: u32,
    pub format: OutputFormat,
    pub mime_type: String,
    pub size_bytes: u64,
    /// Present only when the orientation is not the normal one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exif_orientation: Option<u8>,
}

impl ImageInfo {
    /// Dimensions after auto-orientation, as the pipeline sees them
    pub fn display_dimensions(&self) -> (u32, u32) {
        match self.exif_orientation {
            Some(5..=8) => (self.height, self.width),
            _ => (self.width, self.height),
        }
    }
}

/// Read dimensions, format and EXIF orientation from the image header
pub fn probe(data: &[u8]) -> ProcessingResult<ImageInfo> {
    let image_format = sniff_format(data)?;
    let format = decodable_format(image_format).ok_or_else(|| {
        ProcessingError::UnsupportedFormat(format!("No decoder available for {:?}", image_format))
    })?;

    let reader = ImageReader::with_format(Cursor::new(data), image_format);
    let (width, height) = reader.into_dimensions().map_err(|e| {
        ProcessingError::CorruptData(format!("Failed to read {} header: {}", format, e))
    })?;

    let orientation = read_exif_orientation(data);

    Ok(ImageInfo {
        width,
        height,
        format,
        mime_type: format.mime_type().to_string(),
        size_bytes: data.len() as u64,
        exif_orientation: (orientation != 1).then_some(orientation),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};

    fn create_test_image(format: ImageFormat) -> Vec<u8> {
        let img = RgbaImage::from_pixel(100, 60, Rgba([255, 0, 0, 255]));
        let mut buffer = Vec::new();
        img.write_to(&mut Cursor::new(&mut buffer), format).unwrap();
        buffer
    }

    #[test]
    fn test_probe_png() {
        let data = create_test_image(ImageFormat::Png);
        let info = probe(&data).unwrap();

        assert_eq!((info.width, info.height), (100, 60));
        assert_eq!(info.format, OutputFormat::Png);
        assert_eq!(info.mime_type, "image/png");
        assert_eq!(info.size_bytes, data.len() as u64);
        assert_eq!(info.exif_orientation, None);
        assert_eq!(info.display_dimensions(), (100, 60));
    }

    #[test]
    fn test_probe_bmp() {
        let data = create_test_image(ImageFormat::Bmp);
        let info = probe(&data).unwrap();
        assert_eq!(info.format, OutputFormat::Bmp);
    }

    #[test]
    fn test_probe_invalid() {
        assert!(matches!(
            probe(b"not an image"),
            Err(ProcessingError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_avif_input_is_unsupported_like_decode() {
        // ISO-BMFF header with the avif brand; encodable but not decodable
        let data = b"\0\0\0\x1cftypavif\0\0\0\0avifmif1miaf";
        assert!(matches!(
            probe(data),
            Err(ProcessingError::UnsupportedFormat(_))
        ));
        assert!(matches!(
            crate::codec::decode(data, None),
            Err(ProcessingError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_display_dimensions_swap() {
        let info = ImageInfo {
            width: 40,
            height: 30,
            format: OutputFormat::Jpeg,
            mime_type: "image/jpeg".to_string(),
            size_bytes: 1,
            exif_orientation: Some(6),
        };
        assert_eq!(info.display_dimensions(), (30, 40));
    }

    #[test]
    fn test_image_info_serialization() {
        let info = probe(&create_test_image(ImageFormat::Png)).unwrap();
        let json = serde_json::to_string(&info).unwrap();
        assert!(!json.contains("exif_orientation"));
        let deserialized: ImageInfo = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, info);
    }
}
