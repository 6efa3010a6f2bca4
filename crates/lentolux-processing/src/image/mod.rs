//! Image processing module
//!
//! Raster text watermarking for uploaded images.

pub mod watermark;

pub use watermark::{decode_image, TextWatermark, WatermarkStyle};
