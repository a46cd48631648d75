//! Ordered list of operations applied to one decoded buffer

use crate::buffer::PixelBuffer;
use crate::codec::{self, DecodeOptions};
use crate::error::{PipelineError, ProcessingResult};
use crate::image::{compose, filters, geometry};
use crate::operation::Operation;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Serializes as a plain JSON array of operations
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pipeline {
    operations: Vec<Operation>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an operation, builder style
    pub fn then(mut self, operation: Operation) -> Self {
        self.operations.push(operation);
        self
    }

    pub fn push(&mut self, operation: Operation) {
        self.operations.push(operation);
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Parse a JSON array of operations, or a single operation object
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        if value.is_array() {
            serde_json::from_value(value)
        } else {
            let operation: Operation = serde_json::from_value(value)?;
            Ok(Self::from(vec![operation]))
        }
    }

    /// Validate every operation, reporting the first invalid one
    pub fn validate(&self) -> Result<(), PipelineError> {
        for (index, operation) in self.operations.iter().enumerate() {
            operation
                .validate()
                .map_err(|source| PipelineError::Operation {
                    index,
                    kind: operation.kind(),
                    source,
                })?;
        }
        Ok(())
    }

    /// Apply each operation in order. The first failure aborts the run.
    pub fn apply(
        &self,
        mut buf: PixelBuffer,
        options: &DecodeOptions,
    ) -> Result<PixelBuffer, PipelineError> {
        for (index, operation) in self.operations.iter().enumerate() {
            let kind = operation.kind();
            let start = Instant::now();

            buf = apply_operation(operation, buf, options).map_err(|source| {
                tracing::debug!(
                    index = index,
                    kind = %kind,
                    error = %source,
                    "Pipeline operation failed"
                );
                PipelineError::Operation {
                    index,
                    kind,
                    source,
                }
            })?;

            tracing::debug!(
                index = index,
                kind = %kind,
                width = buf.width(),
                height = buf.height(),
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "Applied pipeline operation"
            );
        }
        Ok(buf)
    }
}

impl From<Vec<Operation>> for Pipeline {
    fn from(operations: Vec<Operation>) -> Self {
        Self { operations }
    }
}

impl FromIterator<Operation> for Pipeline {
    fn from_iter<I: IntoIterator<Item = Operation>>(iter: I) -> Self {
        Self {
            operations: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Pipeline {
    type Item = &'a Operation;
    type IntoIter = std::slice::Iter<'a, Operation>;

    fn into_iter(self) -> Self::IntoIter {
        self.operations.iter()
    }
}

/// Run a single operation against a buffer
pub fn apply_operation(
    operation: &Operation,
    mut buf: PixelBuffer,
    options: &DecodeOptions,
) -> ProcessingResult<PixelBuffer> {
    match operation {
        Operation::Resize {
            width,
            height,
            maintain_aspect,
        } => geometry::resize(&buf, *width, *height, *maintain_aspect, options.max_dimension),
        Operation::Crop {
            width,
            height,
            x,
            y,
        } => geometry::crop(&buf, *width, *height, *x, *y, options.max_dimension),
        Operation::Rotate { angle, background } => {
            geometry::rotate(&buf, *angle, *background, options.max_dimension)
        }
        Operation::Flip { direction } => geometry::flip(&buf, *direction),
        Operation::Thumbnail { size } => {
            geometry::thumbnail(&buf, *size, options.max_dimension)
        }
        Operation::Grayscale => {
            filters::grayscale(&mut buf);
            Ok(buf)
        }
        Operation::Sepia => {
            filters::sepia(&mut buf);
            Ok(buf)
        }
        Operation::Brightness { level } => {
            filters::brightness(&mut buf, *level);
            Ok(buf)
        }
        Operation::Contrast { level } => {
            filters::contrast(&mut buf, *level);
            Ok(buf)
        }
        Operation::Gamma { value } => {
            filters::gamma(&mut buf, *value)?;
            Ok(buf)
        }
        Operation::Invert => {
            filters::invert(&mut buf);
            Ok(buf)
        }
        Operation::Blur { radius } => {
            filters::blur(&mut buf, *radius)?;
            Ok(buf)
        }
        Operation::Sharpen { amount } => {
            filters::sharpen(&mut buf, *amount)?;
            Ok(buf)
        }
        Operation::Pixelate { block_size } => {
            filters::pixelate(&mut buf, *block_size)?;
            Ok(buf)
        }
        Operation::Colorize { r, g, b } => {
            filters::colorize(&mut buf, *r, *g, *b);
            Ok(buf)
        }
        Operation::Watermark {
            overlay,
            position,
            offset_x,
            offset_y,
            opacity,
        } => {
            let encoded = overlay.load()?;
            let overlay_buf = codec::decode_with(&encoded, None, options)?;
            compose::watermark(
                &mut buf,
                &overlay_buf,
                *position,
                *offset_x,
                *offset_y,
                *opacity,
            )?;
            Ok(buf)
        }
        Operation::Text {
            text,
            x,
            y,
            size,
            color,
            font_path,
        } => {
            compose::text(&mut buf, text, *x, *y, *size, *color, font_path.as_deref())?;
            Ok(buf)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;
    use crate::error::ErrorKind;
    use crate::image::geometry::FlipDirection;
    use crate::operation::OperationKind;

    #[test]
    fn test_pipeline_serializes_as_array() {
        let pipeline = Pipeline::new()
            .then(Operation::Grayscale)
            .then(Operation::flip(FlipDirection::Vertical));
        let json = serde_json::to_string(&pipeline).unwrap();
        assert_eq!(
            json,
            r#"[{"op":"grayscale"},{"op":"flip","direction":"vertical"}]"#
        );
        assert_eq!(Pipeline::from_json(&json).unwrap(), pipeline);
    }

    #[test]
    fn test_from_json_single_object() {
        let pipeline = Pipeline::from_json(r#"{"op":"invert"}"#).unwrap();
        assert_eq!(pipeline.operations(), &[Operation::Invert]);
        assert!(Pipeline::from_json("[{\"op\":\"nope\"}]").is_err());
    }

    #[test]
    fn test_validate_reports_first_invalid_index() {
        let pipeline = Pipeline::from(vec![
            Operation::Grayscale,
            Operation::Gamma { value: 0.0 },
            Operation::Blur { radius: 0 },
        ]);
        let err = pipeline.validate().unwrap_err();
        assert_eq!(err.operation_index(), Some(1));
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
        assert!(matches!(
            err,
            PipelineError::Operation {
                kind: OperationKind::Gamma,
                ..
            }
        ));
    }

    #[test]
    fn test_apply_in_order() {
        let buf = PixelBuffer::new(20, 10, [255, 0, 0, 255]).unwrap();

        let pipeline = Pipeline::new()
            .then(Operation::Crop {
                width: 10,
                height: 10,
                x: Some(0),
                y: Some(0),
            })
            .then(Operation::Resize {
                width: 4,
                height: 2,
                maintain_aspect: false,
            });
        let out = pipeline.apply(buf.clone(), &DecodeOptions::default()).unwrap();
        assert_eq!(out.dimensions(), (4, 2));

        let reversed = Pipeline::new()
            .then(Operation::Resize {
                width: 4,
                height: 2,
                maintain_aspect: false,
            })
            .then(Operation::Crop {
                width: 10,
                height: 10,
                x: Some(0),
                y: Some(0),
            });
        let err = reversed.apply(buf, &DecodeOptions::default()).unwrap_err();
        assert_eq!(err.operation_index(), Some(1));
        assert_eq!(err.kind(), ErrorKind::OutOfBounds);
    }

    #[test]
    fn test_empty_pipeline_is_identity() {
        let buf = PixelBuffer::new(3, 3, [1, 2, 3, 4]).unwrap();
        let out = Pipeline::new()
            .apply(buf.clone(), &DecodeOptions::default())
            .unwrap();
        assert_eq!(out, buf);
    }

    #[test]
    fn test_watermark_from_missing_path() {
        let buf = PixelBuffer::new(10, 10, [255, 255, 255, 255]).unwrap();
        let op = Operation::Watermark {
            overlay: crate::operation::OverlaySource::Path("/nonexistent/logo.png".into()),
            position: Default::default(),
            offset_x: 0,
            offset_y: 0,
            opacity: 100,
        };
        let err = apply_operation(&op, buf, &DecodeOptions::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
    }

    #[test]
    fn test_text_operation_changes_pixels() {
        let buf = PixelBuffer::new(60, 30, [255, 255, 255, 255]).unwrap();
        let op = Operation::Text {
            text: "ok".to_string(),
            x: 2,
            y: 2,
            size: 8,
            color: Color::BLACK,
            font_path: None,
        };
        let out = apply_operation(&op, buf.clone(), &DecodeOptions::default()).unwrap();
        assert_ne!(out, buf);
    }

    #[test]
    fn test_output_larger_than_max_dimension_is_rejected() {
        let buf = PixelBuffer::new(10, 10, [0, 0, 0, 255]).unwrap();
        let pipeline = Pipeline::from(vec![
            Operation::Invert,
            Operation::Resize {
                width: 200_000,
                height: 200_000,
                maintain_aspect: false,
            },
        ]);
        let err = pipeline.apply(buf.clone(), &DecodeOptions::default()).unwrap_err();
        assert_eq!(err.operation_index(), Some(1));
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);

        let options = DecodeOptions {
            max_dimension: 8,
            ..DecodeOptions::default()
        };
        let thumb = Pipeline::from(vec![Operation::Thumbnail { size: 9 }]);
        assert_eq!(
            thumb.apply(buf, &options).unwrap_err().kind(),
            ErrorKind::InvalidParameter
        );
    }
}
