//! Codec adapter: encoded bytes to [`PixelBuffer`] and back

use crate::buffer::PixelBuffer;
use crate::error::{ProcessingError, ProcessingResult};
use crate::format::{EncodedImage, OutputFormat};
use crate::image::orientation;
use bytes::Bytes;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::error::ImageError;
use image::{ExtendedColorType, ImageEncoder, ImageFormat, ImageReader, Limits, RgbImage};
use pixmill_core::ProcessorConfig;
use std::io::Cursor;

/// Input constraints applied while decoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Apply the EXIF orientation tag and drop it
    pub auto_orient: bool,
    pub max_dimension: u32,
    pub max_input_bytes: usize,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self::from(&ProcessorConfig::default())
    }
}

impl From<&ProcessorConfig> for DecodeOptions {
    fn from(config: &ProcessorConfig) -> Self {
        Self {
            auto_orient: config.auto_orient,
            max_dimension: config.max_dimension,
            max_input_bytes: config.max_input_bytes,
        }
    }
}

/// Encoder settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeOptions {
    /// 0-100, used by lossy formats only
    pub quality: u8,
    /// PNG compression level 0-9
    pub png_compression: u8,
}

impl EncodeOptions {
    pub fn new(quality: u8) -> Self {
        Self {
            quality,
            png_compression: ProcessorConfig::default().png_compression,
        }
    }
}

/// Formats a decoder is available for, keyed by byte signature
pub(crate) fn decodable_format(format: ImageFormat) -> Option<OutputFormat> {
    match format {
        ImageFormat::Jpeg => Some(OutputFormat::Jpeg),
        ImageFormat::Png => Some(OutputFormat::Png),
        ImageFormat::WebP => Some(OutputFormat::Webp),
        ImageFormat::Gif => Some(OutputFormat::Gif),
        ImageFormat::Bmp => Some(OutputFormat::Bmp),
        _ => None,
    }
}

/// Identify the container from its byte signature
pub fn sniff_format(data: &[u8]) -> ProcessingResult<ImageFormat> {
    image::guess_format(data).map_err(|_| {
        ProcessingError::UnsupportedFormat("Unrecognized image signature".to_string())
    })
}

/// Decode with default limits and auto-orientation
pub fn decode(data: &[u8], hint: Option<OutputFormat>) -> ProcessingResult<PixelBuffer> {
    decode_with(data, hint, &DecodeOptions::default())
}

/// Decode encoded bytes into an upright RGBA buffer.
///
/// The byte signature decides the decoder; a disagreeing `hint` is only logged.
pub fn decode_with(
    data: &[u8],
    hint: Option<OutputFormat>,
    options: &DecodeOptions,
) -> ProcessingResult<PixelBuffer> {
    if data.len() > options.max_input_bytes {
        return Err(ProcessingError::invalid(format!(
            "Input of {} bytes exceeds the {} byte limit",
            data.len(),
            options.max_input_bytes
        )));
    }

    let format = sniff_format(data)?;
    let detected = decodable_format(format).ok_or_else(|| {
        ProcessingError::UnsupportedFormat(format!("No decoder available for {:?}", format))
    })?;

    if let Some(hint) = hint {
        if hint != detected {
            tracing::debug!(
                hint = %hint,
                detected = %detected,
                "Format hint disagrees with byte signature, using signature"
            );
        }
    }

    let mut limits = Limits::default();
    limits.max_image_width = Some(options.max_dimension);
    limits.max_image_height = Some(options.max_dimension);

    let mut reader = ImageReader::with_format(Cursor::new(data), format);
    reader.limits(limits);

    let img = reader.decode().map_err(|e| match e {
        ImageError::Limits(limit) => ProcessingError::invalid(format!(
            "Image exceeds the maximum dimension of {}px: {}",
            options.max_dimension, limit
        )),
        ImageError::Unsupported(u) => ProcessingError::UnsupportedFormat(u.to_string()),
        other => ProcessingError::CorruptData(format!("Failed to decode {}: {}", detected, other)),
    })?;

    let mut rgba = img.into_rgba8();

    if options.auto_orient {
        let orientation = orientation::read_exif_orientation(data);
        rgba = orientation::apply_orientation(rgba, orientation);
    }

    PixelBuffer::from_image(rgba)
}

/// Encode with the default PNG compression level
pub fn encode(buf: &PixelBuffer, format: OutputFormat, quality: u8) -> ProcessingResult<EncodedImage> {
    encode_with(buf, format, &EncodeOptions::new(quality))
}

pub fn encode_with(
    buf: &PixelBuffer,
    format: OutputFormat,
    options: &EncodeOptions,
) -> ProcessingResult<EncodedImage> {
    if format.is_lossy() && options.quality > 100 {
        return Err(ProcessingError::invalid(format!(
            "Quality must be between 0 and 100, got {}",
            options.quality
        )));
    }
    if format == OutputFormat::Png && options.png_compression > 9 {
        return Err(ProcessingError::invalid(format!(
            "PNG compression must be between 0 and 9, got {}",
            options.png_compression
        )));
    }

    let data = match format {
        OutputFormat::Jpeg => encode_jpeg(buf, options.quality)?,
        OutputFormat::Png => encode_png(buf, options.png_compression)?,
        OutputFormat::Webp => encode_webp(buf, options.quality)?,
        OutputFormat::Gif => encode_with_image_crate(buf, ImageFormat::Gif)?,
        OutputFormat::Bmp => encode_with_image_crate(buf, ImageFormat::Bmp)?,
        OutputFormat::Avif => encode_avif(buf, options.quality)?,
    };

    Ok(EncodedImage {
        format,
        quality: options.quality,
        bytes: data,
        width: buf.width(),
        height: buf.height(),
    })
}

/// Composite onto white and drop alpha
fn flatten_on_white(buf: &PixelBuffer) -> RgbImage {
    let (width, height) = buf.dimensions();
    let mut rgb = RgbImage::new(width, height);
    for (src, dst) in buf.as_image().pixels().zip(rgb.pixels_mut()) {
        let alpha = src[3] as u32;
        for c in 0..3 {
            dst[c] = ((src[c] as u32 * alpha + 255 * (255 - alpha) + 127) / 255) as u8;
        }
    }
    rgb
}

/// Encode to JPEG using mozjpeg
fn encode_jpeg(buf: &PixelBuffer, quality: u8) -> ProcessingResult<Bytes> {
    let rgb_img = flatten_on_white(buf);
    let (width, height) = rgb_img.dimensions();
    let failed = |e: std::io::Error| ProcessingError::EncodeFailed(format!("JPEG: {}", e));

    let mut comp = mozjpeg::Compress::new(mozjpeg::ColorSpace::JCS_RGB);
    comp.set_size(width as usize, height as usize);
    comp.set_quality(quality.max(1) as f32);
    comp.set_progressive_mode();
    comp.set_optimize_coding(true);

    let mut comp = comp.start_compress(Vec::new()).map_err(failed)?;
    comp.write_scanlines(rgb_img.as_raw()).map_err(failed)?;
    let jpeg_data = comp.finish().map_err(failed)?;

    Ok(Bytes::from(jpeg_data))
}

fn encode_png(buf: &PixelBuffer, level: u8) -> ProcessingResult<Bytes> {
    let compression = match level {
        0..=3 => CompressionType::Fast,
        4..=6 => CompressionType::Default,
        _ => CompressionType::Best,
    };

    let mut buffer = Vec::new();
    let encoder = PngEncoder::new_with_quality(Cursor::new(&mut buffer), compression, PngFilter::Adaptive);
    encoder
        .write_image(
            buf.as_raw(),
            buf.width(),
            buf.height(),
            ExtendedColorType::Rgba8,
        )
        .map_err(|e| ProcessingError::EncodeFailed(format!("PNG: {}", e)))?;

    Ok(Bytes::from(buffer))
}

/// Lossy WebP through libwebp
fn encode_webp(buf: &PixelBuffer, quality: u8) -> ProcessingResult<Bytes> {
    let encoder = webp::Encoder::from_rgba(buf.as_raw(), buf.width(), buf.height());
    let webp_data = encoder
        .encode_simple(false, quality as f32)
        .map_err(|e| ProcessingError::EncodeFailed(format!("WebP: {:?}", e)))?;

    Ok(Bytes::copy_from_slice(&webp_data))
}

fn encode_with_image_crate(buf: &PixelBuffer, format: ImageFormat) -> ProcessingResult<Bytes> {
    let mut buffer = Vec::new();
    buf.as_image()
        .write_to(&mut Cursor::new(&mut buffer), format)
        .map_err(|e| ProcessingError::EncodeFailed(format!("{:?}: {}", format, e)))?;
    Ok(Bytes::from(buffer))
}

fn encode_avif(buf: &PixelBuffer, quality: u8) -> ProcessingResult<Bytes> {
    let (width, height) = (buf.width() as usize, buf.height() as usize);
    let encoder = ravif::Encoder::new()
        .with_quality(quality as f32)
        .with_alpha_quality(quality as f32)
        .with_speed(6);

    let encoded = if buf.has_alpha() {
        let pixels: Vec<rgb::RGBA8> = buf
            .as_raw()
            .chunks_exact(4)
            .map(|p| rgb::RGBA8::new(p[0], p[1], p[2], p[3]))
            .collect();
        encoder.encode_rgba(ravif::Img::new(pixels.as_slice(), width, height))
    } else {
        let pixels: Vec<rgb::RGB8> = buf
            .as_raw()
            .chunks_exact(4)
            .map(|p| rgb::RGB8::new(p[0], p[1], p[2]))
            .collect();
        encoder.encode_rgb(ravif::Img::new(pixels.as_slice(), width, height))
    }
    .map_err(|e| ProcessingError::EncodeFailed(format!("AVIF: {}", e)))?;

    Ok(Bytes::from(encoded.avif_file))
}
