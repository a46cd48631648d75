//! Typed image operations.
//!
//! Operations serialize as JSON objects tagged by `op`, e.g.
//! `{"op": "resize", "width": 100, "height": 100}`. Omitted parameters take the
//! defaults declared on each variant.

use crate::color::Color;
use crate::error::{ProcessingError, ProcessingResult};
use crate::image::compose::{self, Anchor};
use crate::image::geometry::FlipDirection;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

pub const DEFAULT_BLUR_RADIUS: u32 = 5;
pub const DEFAULT_BRIGHTNESS: i32 = 10;
pub const DEFAULT_CONTRAST: i32 = 10;
pub const DEFAULT_GAMMA: f32 = 1.2;
pub const DEFAULT_PIXELATE_BLOCK: u32 = 10;
pub const DEFAULT_SHARPEN: u32 = 10;
pub const DEFAULT_WATERMARK_OFFSET: i32 = 10;
pub const DEFAULT_TEXT_OFFSET: i32 = 10;
pub const DEFAULT_TEXT_SIZE: u32 = 16;
pub const DEFAULT_THUMBNAIL_SIZE: u32 = 150;

fn default_true() -> bool {
    true
}
fn default_background() -> Color {
    Color::WHITE
}
fn default_blur_radius() -> u32 {
    DEFAULT_BLUR_RADIUS
}
fn default_brightness() -> i32 {
    DEFAULT_BRIGHTNESS
}
fn default_contrast() -> i32 {
    DEFAULT_CONTRAST
}
fn default_gamma() -> f32 {
    DEFAULT_GAMMA
}
fn default_pixelate_block() -> u32 {
    DEFAULT_PIXELATE_BLOCK
}
fn default_sharpen() -> u32 {
    DEFAULT_SHARPEN
}
fn default_watermark_offset() -> i32 {
    DEFAULT_WATERMARK_OFFSET
}
fn default_opacity() -> u8 {
    100
}
fn default_text_offset() -> i32 {
    DEFAULT_TEXT_OFFSET
}
fn default_text_size() -> u32 {
    DEFAULT_TEXT_SIZE
}
fn default_thumbnail_size() -> u32 {
    DEFAULT_THUMBNAIL_SIZE
}

/// Where a watermark image comes from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlaySource {
    /// Encoded image read from disk when the operation runs
    Path(PathBuf),
    /// Encoded image bytes carried by the operation
    Bytes(Bytes),
}

impl OverlaySource {
    /// Encoded overlay bytes
    pub fn load(&self) -> ProcessingResult<Bytes> {
        match self {
            OverlaySource::Path(path) => std::fs::read(path).map(Bytes::from).map_err(|e| {
                ProcessingError::invalid(format!(
                    "Cannot read watermark {}: {}",
                    path.display(),
                    e
                ))
            }),
            OverlaySource::Bytes(bytes) => Ok(bytes.clone()),
        }
    }
}

impl From<PathBuf> for OverlaySource {
    fn from(path: PathBuf) -> Self {
        OverlaySource::Path(path)
    }
}

impl From<Bytes> for OverlaySource {
    fn from(bytes: Bytes) -> Self {
        OverlaySource::Bytes(bytes)
    }
}

/// A single image transformation with its parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    Resize {
        width: u32,
        height: u32,
        #[serde(default = "default_true")]
        maintain_aspect: bool,
    },
    /// Explicit box when `x` and `y` are set, centered cover crop otherwise
    Crop {
        width: u32,
        height: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        x: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        y: Option<u32>,
    },
    /// Counter-clockwise, in degrees
    Rotate {
        angle: f32,
        #[serde(default = "default_background")]
        background: Color,
    },
    Flip {
        #[serde(default)]
        direction: FlipDirection,
    },
    Grayscale,
    Sepia,
    Blur {
        #[serde(default = "default_blur_radius")]
        radius: u32,
    },
    Brightness {
        #[serde(default = "default_brightness")]
        level: i32,
    },
    Contrast {
        #[serde(default = "default_contrast")]
        level: i32,
    },
    Gamma {
        #[serde(default = "default_gamma")]
        value: f32,
    },
    Invert,
    Pixelate {
        #[serde(default = "default_pixelate_block")]
        block_size: u32,
    },
    Sharpen {
        #[serde(default = "default_sharpen")]
        amount: u32,
    },
    Colorize {
        r: u8,
        g: u8,
        b: u8,
    },
    Watermark {
        overlay: OverlaySource,
        #[serde(default)]
        position: Anchor,
        #[serde(default = "default_watermark_offset")]
        offset_x: i32,
        #[serde(default = "default_watermark_offset")]
        offset_y: i32,
        /// Percent, 0-100
        #[serde(default = "default_opacity")]
        opacity: u8,
    },
    Text {
        text: String,
        #[serde(default = "default_text_offset")]
        x: i32,
        #[serde(default = "default_text_offset")]
        y: i32,
        #[serde(default = "default_text_size")]
        size: u32,
        #[serde(default)]
        color: Color,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        font_path: Option<PathBuf>,
    },
    /// Fit into a white `size`x`size` square
    Thumbnail {
        #[serde(default = "default_thumbnail_size")]
        size: u32,
    },
}

/// Fieldless mirror of [`Operation`] used in errors and logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Resize,
    Crop,
    Rotate,
    Flip,
    Grayscale,
    Sepia,
    Blur,
    Brightness,
    Contrast,
    Gamma,
    Invert,
    Pixelate,
    Sharpen,
    Colorize,
    Watermark,
    Text,
    Thumbnail,
}

impl OperationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            OperationKind::Resize => "resize",
            OperationKind::Crop => "crop",
            OperationKind::Rotate => "rotate",
            OperationKind::Flip => "flip",
            OperationKind::Grayscale => "grayscale",
            OperationKind::Sepia => "sepia",
            OperationKind::Blur => "blur",
            OperationKind::Brightness => "brightness",
            OperationKind::Contrast => "contrast",
            OperationKind::Gamma => "gamma",
            OperationKind::Invert => "invert",
            OperationKind::Pixelate => "pixelate",
            OperationKind::Sharpen => "sharpen",
            OperationKind::Colorize => "colorize",
            OperationKind::Watermark => "watermark",
            OperationKind::Text => "text",
            OperationKind::Thumbnail => "thumbnail",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn positive(name: &str, value: u32) -> ProcessingResult<()> {
    if value == 0 {
        return Err(ProcessingError::invalid(format!(
            "{} must be greater than 0",
            name
        )));
    }
    Ok(())
}

impl Operation {
    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::Resize { .. } => OperationKind::Resize,
            Operation::Crop { .. } => OperationKind::Crop,
            Operation::Rotate { .. } => OperationKind::Rotate,
            Operation::Flip { .. } => OperationKind::Flip,
            Operation::Grayscale => OperationKind::Grayscale,
            Operation::Sepia => OperationKind::Sepia,
            Operation::Blur { .. } => OperationKind::Blur,
            Operation::Brightness { .. } => OperationKind::Brightness,
            Operation::Contrast { .. } => OperationKind::Contrast,
            Operation::Gamma { .. } => OperationKind::Gamma,
            Operation::Invert => OperationKind::Invert,
            Operation::Pixelate { .. } => OperationKind::Pixelate,
            Operation::Sharpen { .. } => OperationKind::Sharpen,
            Operation::Colorize { .. } => OperationKind::Colorize,
            Operation::Watermark { .. } => OperationKind::Watermark,
            Operation::Text { .. } => OperationKind::Text,
            Operation::Thumbnail { .. } => OperationKind::Thumbnail,
        }
    }

    /// Check parameters without touching any pixels.
    ///
    /// Brightness and contrast levels are clamped when applied, not rejected.
    pub fn validate(&self) -> ProcessingResult<()> {
        match self {
            Operation::Resize { width, height, .. } => {
                positive("resize width", *width)?;
                positive("resize height", *height)
            }
            Operation::Crop { width, height, x, y } => {
                positive("crop width", *width)?;
                positive("crop height", *height)?;
                if x.is_some() != y.is_some() {
                    return Err(ProcessingError::invalid(
                        "crop x and y must be given together",
                    ));
                }
                Ok(())
            }
            Operation::Rotate { angle, .. } => {
                if !angle.is_finite() {
                    return Err(ProcessingError::invalid(format!(
                        "Rotation angle must be finite, got {}",
                        angle
                    )));
                }
                Ok(())
            }
            Operation::Gamma { value } => {
                if !value.is_finite() || *value <= 0.0 {
                    return Err(ProcessingError::invalid(format!(
                        "Gamma must be a positive number, got {}",
                        value
                    )));
                }
                Ok(())
            }
            Operation::Blur { radius } => positive("blur radius", *radius),
            Operation::Pixelate { block_size } => positive("pixelate block size", *block_size),
            Operation::Sharpen { amount } => positive("sharpen amount", *amount),
            Operation::Watermark {
                overlay, opacity, ..
            } => {
                if *opacity > 100 {
                    return Err(ProcessingError::invalid(format!(
                        "Watermark opacity must be between 0 and 100, got {}",
                        opacity
                    )));
                }
                match overlay {
                    OverlaySource::Bytes(bytes) if bytes.is_empty() => {
                        Err(ProcessingError::invalid("Watermark image is empty"))
                    }
                    OverlaySource::Path(path) if path.as_os_str().is_empty() => {
                        Err(ProcessingError::invalid("Watermark path is empty"))
                    }
                    _ => Ok(()),
                }
            }
            Operation::Text { size, .. } => compose::check_text_size(*size),
            Operation::Thumbnail { size } => positive("thumbnail size", *size),
            Operation::Flip { .. }
            | Operation::Grayscale
            | Operation::Sepia
            | Operation::Brightness { .. }
            | Operation::Contrast { .. }
            | Operation::Invert
            | Operation::Colorize { .. } => Ok(()),
        }
    }

    fn checked(self) -> ProcessingResult<Self> {
        self.validate()?;
        Ok(self)
    }

    pub fn resize(width: u32, height: u32, maintain_aspect: bool) -> ProcessingResult<Self> {
        Operation::Resize {
            width,
            height,
            maintain_aspect,
        }
        .checked()
    }

    pub fn crop(width: u32, height: u32, origin: Option<(u32, u32)>) -> ProcessingResult<Self> {
        Operation::Crop {
            width,
            height,
            x: origin.map(|(x, _)| x),
            y: origin.map(|(_, y)| y),
        }
        .checked()
    }

    pub fn rotate(angle: f32, background: Color) -> ProcessingResult<Self> {
        Operation::Rotate { angle, background }.checked()
    }

    pub fn flip(direction: FlipDirection) -> Self {
        Operation::Flip { direction }
    }

    pub fn gamma(value: f32) -> ProcessingResult<Self> {
        Operation::Gamma { value }.checked()
    }

    pub fn colorize(r: u8, g: u8, b: u8) -> Self {
        Operation::Colorize { r, g, b }
    }

    pub fn watermark(
        overlay: impl Into<OverlaySource>,
        position: Anchor,
        offset_x: i32,
        offset_y: i32,
        opacity: u8,
    ) -> ProcessingResult<Self> {
        Operation::Watermark {
            overlay: overlay.into(),
            position,
            offset_x,
            offset_y,
            opacity,
        }
        .checked()
    }

    /// Text at the default position, size and color
    pub fn text(text: impl Into<String>) -> Self {
        Operation::Text {
            text: text.into(),
            x: DEFAULT_TEXT_OFFSET,
            y: DEFAULT_TEXT_OFFSET,
            size: DEFAULT_TEXT_SIZE,
            color: Color::BLACK,
            font_path: None,
        }
    }

    pub fn thumbnail(size: u32) -> ProcessingResult<Self> {
        Operation::Thumbnail { size }.checked()
    }

    /// Build a filter operation from its name and an optional intensity.
    ///
    /// Missing intensity falls back to the filter's default. Intensities must be
    /// whole numbers except for gamma. Colorize takes three channel values and
    /// is built with [`Operation::colorize`] instead.
    pub fn filter(name: &str, intensity: Option<f64>) -> ProcessingResult<Self> {
        if let Some(value) = intensity {
            if !value.is_finite() {
                return Err(ProcessingError::invalid(format!(
                    "Filter intensity must be a number, got {}",
                    value
                )));
            }
        }

        let whole = |default: i64| -> ProcessingResult<i64> {
            match intensity {
                None => Ok(default),
                Some(v) if v.fract() == 0.0 => Ok(v as i64),
                Some(v) => Err(ProcessingError::invalid(format!(
                    "Filter '{}' needs a whole-number intensity, got {}",
                    name, v
                ))),
            }
        };
        let unsigned = |default: u32| -> ProcessingResult<u32> {
            let value = whole(default as i64)?;
            u32::try_from(value).map_err(|_| {
                ProcessingError::invalid(format!(
                    "Filter '{}' needs a non-negative intensity, got {}",
                    name, value
                ))
            })
        };
        let signed = |default: i32| -> ProcessingResult<i32> {
            // Clamped to [-100, 100] when applied
            Ok(whole(default as i64)?.clamp(i32::MIN as i64, i32::MAX as i64) as i32)
        };

        let op = match name.trim().to_lowercase().as_str() {
            "grayscale" | "greyscale" => Operation::Grayscale,
            "sepia" => Operation::Sepia,
            "invert" => Operation::Invert,
            "blur" => Operation::Blur {
                radius: unsigned(DEFAULT_BLUR_RADIUS)?,
            },
            "brightness" => Operation::Brightness {
                level: signed(DEFAULT_BRIGHTNESS)?,
            },
            "contrast" => Operation::Contrast {
                level: signed(DEFAULT_CONTRAST)?,
            },
            "gamma" => Operation::Gamma {
                value: intensity.map(|v| v as f32).unwrap_or(DEFAULT_GAMMA),
            },
            "pixelate" => Operation::Pixelate {
                block_size: unsigned(DEFAULT_PIXELATE_BLOCK)?,
            },
            "sharpen" => Operation::Sharpen {
                amount: unsigned(DEFAULT_SHARPEN)?,
            },
            "colorize" => {
                return Err(ProcessingError::invalid(
                    "Filter 'colorize' needs r, g and b values, not a single intensity",
                ))
            }
            other => {
                return Err(ProcessingError::invalid(format!(
                    "Unknown filter: {}",
                    other
                )))
            }
        };

        op.checked()
    }
}
