//! Pixel operations on decoded buffers
//!
//! - `geometry`: resize, crop, rotate, flip, thumbnail
//! - `filters`: per-pixel color adjustments and convolutions
//! - `compose`: watermark and text overlays
//! - `orientation`: EXIF orientation handling at decode time

pub mod compose;
pub mod filters;
pub mod geometry;
pub mod orientation;

pub use compose::Anchor;
pub use geometry::FlipDirection;
