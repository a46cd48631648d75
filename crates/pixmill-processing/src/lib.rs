//! Pixmill image processing
//!
//! Decodes encoded images into RGBA pixel buffers, applies ordered pipelines of
//! geometry, color and compositing operations, and encodes the result.

pub mod buffer;
pub mod codec;
pub mod color;
pub mod error;
pub mod format;
pub mod image;
pub mod metadata;
pub mod operation;
pub mod pipeline;
pub mod transformer;

pub use buffer::PixelBuffer;
pub use codec::{DecodeOptions, EncodeOptions};
pub use color::Color;
pub use crate::image::{Anchor, FlipDirection};
pub use error::{ErrorKind, PipelineError, ProcessingError, ProcessingResult};
pub use format::{EncodedImage, OutputFormat, OutputSpec};
pub use metadata::{probe, ImageInfo};
pub use operation::{Operation, OperationKind, OverlaySource};
pub use pipeline::Pipeline;
pub use transformer::ImageTransformer;
