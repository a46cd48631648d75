//! Image transformer - runs a pipeline from encoded input to encoded output
//!
//! `execute` validates every operation, decodes once, applies the operations in
//! order and encodes once. The single-operation methods are one-element pipelines.

use crate::buffer::PixelBuffer;
use crate::codec::{self, DecodeOptions, EncodeOptions};
use crate::color::Color;
use crate::error::{PipelineError, ProcessingResult};
use crate::format::{EncodedImage, OutputFormat, OutputSpec};
use crate::image::compose::Anchor;
use crate::image::geometry::FlipDirection;
use crate::metadata::{self, ImageInfo};
use crate::operation::{Operation, OverlaySource};
use crate::pipeline::Pipeline;
use pixmill_core::ProcessorConfig;
use std::path::PathBuf;
use std::time::Instant;

/// Stateless pipeline executor configured with codec defaults and limits
#[derive(Debug, Clone, Default)]
pub struct ImageTransformer {
    config: ProcessorConfig,
}

impl ImageTransformer {
    pub fn new(config: ProcessorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    pub fn decode_options(&self) -> DecodeOptions {
        DecodeOptions::from(&self.config)
    }

    /// Configured quality for a format when the caller gives none
    pub fn default_quality(&self, format: OutputFormat) -> u8 {
        match format {
            OutputFormat::Jpeg => self.config.jpeg_quality,
            OutputFormat::Webp => self.config.webp_quality,
            OutputFormat::Avif => self.config.avif_quality,
            OutputFormat::Png | OutputFormat::Gif | OutputFormat::Bmp => 100,
        }
    }

    fn encode_options(&self, output: &OutputSpec) -> EncodeOptions {
        EncodeOptions {
            quality: output
                .quality
                .unwrap_or_else(|| self.default_quality(output.format)),
            png_compression: self.config.png_compression,
        }
    }

    /// Decode `data`, apply `pipeline` and encode to `output`
    pub fn execute(
        &self,
        data: &[u8],
        format_hint: Option<OutputFormat>,
        pipeline: &Pipeline,
        output: OutputSpec,
    ) -> Result<EncodedImage, PipelineError> {
        pipeline.validate()?;

        let start = Instant::now();
        let buf = codec::decode_with(data, format_hint, &self.decode_options())
            .map_err(PipelineError::Decode)?;
        let (input_width, input_height) = buf.dimensions();

        let encoded = self.render_validated(buf, pipeline, output)?;

        tracing::info!(
            operations = pipeline.len(),
            input_bytes = data.len(),
            input_width = input_width,
            input_height = input_height,
            output_bytes = encoded.len(),
            output_width = encoded.width,
            output_height = encoded.height,
            output_format = %encoded.format,
            quality = encoded.quality,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Image pipeline completed"
        );

        Ok(encoded)
    }

    /// Apply `pipeline` to an already decoded buffer and encode it
    pub fn render(
        &self,
        buf: PixelBuffer,
        pipeline: &Pipeline,
        output: OutputSpec,
    ) -> Result<EncodedImage, PipelineError> {
        pipeline.validate()?;
        self.render_validated(buf, pipeline, output)
    }

    fn render_validated(
        &self,
        buf: PixelBuffer,
        pipeline: &Pipeline,
        output: OutputSpec,
    ) -> Result<EncodedImage, PipelineError> {
        let buf = pipeline.apply(buf, &self.decode_options())?;
        codec::encode_with(&buf, output.format, &self.encode_options(&output))
            .map_err(PipelineError::Encode)
    }

    /// Run a single operation
    pub fn apply(
        &self,
        data: &[u8],
        format_hint: Option<OutputFormat>,
        operation: Operation,
        output: OutputSpec,
    ) -> Result<EncodedImage, PipelineError> {
        self.execute(data, format_hint, &Pipeline::from(vec![operation]), output)
    }

    pub fn resize(
        &self,
        data: &[u8],
        format_hint: Option<OutputFormat>,
        width: u32,
        height: u32,
        maintain_aspect: bool,
        output: OutputSpec,
    ) -> Result<EncodedImage, PipelineError> {
        let op = Operation::Resize {
            width,
            height,
            maintain_aspect,
        };
        self.apply(data, format_hint, op, output)
    }

    /// Crop a box at `origin`, or a centered cover crop when `origin` is `None`
    pub fn crop(
        &self,
        data: &[u8],
        format_hint: Option<OutputFormat>,
        width: u32,
        height: u32,
        origin: Option<(u32, u32)>,
        output: OutputSpec,
    ) -> Result<EncodedImage, PipelineError> {
        let op = Operation::Crop {
            width,
            height,
            x: origin.map(|(x, _)| x),
            y: origin.map(|(_, y)| y),
        };
        self.apply(data, format_hint, op, output)
    }

    pub fn rotate(
        &self,
        data: &[u8],
        format_hint: Option<OutputFormat>,
        angle: f32,
        background: Color,
        output: OutputSpec,
    ) -> Result<EncodedImage, PipelineError> {
        let op = Operation::Rotate { angle, background };
        self.apply(data, format_hint, op, output)
    }

    pub fn flip(
        &self,
        data: &[u8],
        format_hint: Option<OutputFormat>,
        direction: FlipDirection,
        output: OutputSpec,
    ) -> Result<EncodedImage, PipelineError> {
        self.apply(data, format_hint, Operation::Flip { direction }, output)
    }

    /// Apply a filter by name, e.g. `"sepia"` or `"blur"` with an intensity
    pub fn filter(
        &self,
        data: &[u8],
        format_hint: Option<OutputFormat>,
        name: &str,
        intensity: Option<f64>,
        output: OutputSpec,
    ) -> Result<EncodedImage, PipelineError> {
        let op = Operation::filter(name, intensity).map_err(PipelineError::InvalidOperation)?;
        self.apply(data, format_hint, op, output)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn watermark(
        &self,
        data: &[u8],
        format_hint: Option<OutputFormat>,
        overlay: OverlaySource,
        position: Anchor,
        offset_x: i32,
        offset_y: i32,
        opacity: u8,
        output: OutputSpec,
    ) -> Result<EncodedImage, PipelineError> {
        let op = Operation::Watermark {
            overlay,
            position,
            offset_x,
            offset_y,
            opacity,
        };
        self.apply(data, format_hint, op, output)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn text(
        &self,
        data: &[u8],
        format_hint: Option<OutputFormat>,
        text: &str,
        position: (i32, i32),
        size: u32,
        color: Color,
        font_path: Option<PathBuf>,
        output: OutputSpec,
    ) -> Result<EncodedImage, PipelineError> {
        let op = Operation::Text {
            text: text.to_string(),
            x: position.0,
            y: position.1,
            size,
            color,
            font_path,
        };
        self.apply(data, format_hint, op, output)
    }

    pub fn thumbnail(
        &self,
        data: &[u8],
        format_hint: Option<OutputFormat>,
        size: u32,
        output: OutputSpec,
    ) -> Result<EncodedImage, PipelineError> {
        self.apply(data, format_hint, Operation::Thumbnail { size }, output)
    }

    /// Re-encode without transforming, e.g. for format conversion or recompression
    pub fn convert(
        &self,
        data: &[u8],
        format_hint: Option<OutputFormat>,
        output: OutputSpec,
    ) -> Result<EncodedImage, PipelineError> {
        self.execute(data, format_hint, &Pipeline::new(), output)
    }

    pub fn probe(&self, data: &[u8]) -> ProcessingResult<ImageInfo> {
        metadata::probe(data)
    }
}
