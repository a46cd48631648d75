//! Data models shared by the metadata store and the service layer.

mod image;

pub use image::*;
