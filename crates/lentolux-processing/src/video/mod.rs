//! Video processing module

pub mod watermark;

pub use watermark::VideoWatermarker;
