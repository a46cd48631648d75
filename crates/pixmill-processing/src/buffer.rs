use crate::error::{ProcessingError, ProcessingResult};
use image::{DynamicImage, Rgba, RgbaImage};

/// Decoded RGBA8 image owned by one pipeline run.
///
/// Width and height are always positive and the backing buffer holds exactly
/// `width * height * 4` bytes, row-major.
#[derive(Clone, PartialEq)]
pub struct PixelBuffer {
    image: RgbaImage,
}

impl PixelBuffer {
    /// Solid buffer filled with `fill`
    pub fn new(width: u32, height: u32, fill: [u8; 4]) -> ProcessingResult<Self> {
        check_dimensions(width, height)?;
        Ok(Self {
            image: RgbaImage::from_pixel(width, height, Rgba(fill)),
        })
    }

    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> ProcessingResult<Self> {
        check_dimensions(width, height)?;
        let expected = width as usize * height as usize * 4;
        if data.len() != expected {
            return Err(ProcessingError::invalid(format!(
                "Pixel data length {} does not match {}x{} RGBA ({} bytes)",
                data.len(),
                width,
                height,
                expected
            )));
        }
        let image = RgbaImage::from_raw(width, height, data).ok_or_else(|| {
            ProcessingError::invalid(format!("Pixel data does not fit {}x{}", width, height))
        })?;
        Ok(Self { image })
    }

    pub fn from_image(image: RgbaImage) -> ProcessingResult<Self> {
        check_dimensions(image.width(), image.height())?;
        Ok(Self { image })
    }

    pub fn from_dynamic(image: DynamicImage) -> ProcessingResult<Self> {
        Self::from_image(image.into_rgba8())
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        self.image.get_pixel_checked(x, y).map(|p| p.0)
    }

    pub fn as_raw(&self) -> &[u8] {
        self.image.as_raw()
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.image.into_raw()
    }

    pub fn as_image(&self) -> &RgbaImage {
        &self.image
    }

    pub(crate) fn as_image_mut(&mut self) -> &mut RgbaImage {
        &mut self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    /// True when any pixel is not fully opaque
    pub fn has_alpha(&self) -> bool {
        self.image.pixels().any(|p| p[3] < 255)
    }
}

impl std::fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}

fn check_dimensions(width: u32, height: u32) -> ProcessingResult<()> {
    if width == 0 || height == 0 {
        return Err(ProcessingError::invalid(format!(
            "Image dimensions must be positive, got {}x{}",
            width, height
        )));
    }
    Ok(())
}
