use std::f32::consts::FRAC_PI_4;
use std::path::Path;

use ab_glyph::{FontArc, PxScale};
use image::{imageops, DynamicImage, ImageFormat, Rgba, RgbaImage};
use imageproc::drawing::{draw_text_mut, text_size};
use imageproc::geometric_transformations::{rotate_about_center, Interpolation};

use crate::error::{ProcessingError, ProcessingResult};

/// Text watermark appearance
#[derive(Debug, Clone)]
pub struct WatermarkStyle {
    pub text: String,
    pub scale: f32,
    pub color: Rgba<u8>,
    /// Counter-clockwise rotation in radians
    pub rotation: f32,
}

impl Default for WatermarkStyle {
    fn default() -> Self {
        Self {
            text: crate::WATERMARK_TEXT.to_string(),
            scale: 12.0,
            color: Rgba([128, 128, 128, 128]),
            rotation: FRAC_PI_4,
        }
    }
}

/// Centered, rotated, semi-transparent text watermark
#[derive(Clone)]
pub struct TextWatermark {
    font: FontArc,
    style: WatermarkStyle,
}

impl TextWatermark {
    pub fn new(font: FontArc, style: WatermarkStyle) -> Self {
        Self { font, style }
    }

    /// Load the font from a TrueType/OpenType file
    pub fn from_font_file(path: &Path, style: WatermarkStyle) -> ProcessingResult<Self> {
        let bytes = std::fs::read(path)?;
        let font = FontArc::try_from_vec(bytes).map_err(|e| {
            ProcessingError::FontUnavailable(format!("{}: {}", path.display(), e))
        })?;
        Ok(Self::new(font, style))
    }

    pub fn style(&self) -> &WatermarkStyle {
        &self.style
    }

    /// Render the watermark onto a transparent layer the size of the image,
    /// rotate it about the center, and composite it over the image.
    pub fn apply(&self, img: DynamicImage) -> RgbaImage {
        let mut base = img.to_rgba8();
        let (width, height) = base.dimensions();

        let scale = PxScale::from(self.style.scale);
        let (text_w, text_h) = text_size(scale, &self.font, &self.style.text);
        let x = (width as i32 - text_w as i32) / 2;
        let y = (height as i32 - text_h as i32) / 2;

        let mut layer = RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 0]));
        draw_text_mut(
            &mut layer,
            self.style.color,
            x,
            y,
            scale,
            &self.font,
            &self.style.text,
        );

        // rotate_about_center turns clockwise for positive angles
        let rotated = rotate_about_center(
            &layer,
            -self.style.rotation,
            Interpolation::Bilinear,
            Rgba([0, 0, 0, 0]),
        );

        imageops::overlay(&mut base, &rotated, 0, 0);
        base
    }

    /// Decode `data`, watermark it, and write a PNG to `output`.
    ///
    /// Blocking; run it on the blocking pool.
    pub fn watermark_to_png(&self, data: &[u8], output: &Path) -> ProcessingResult<(u32, u32)> {
        let img = decode_image(data)?;
        self.write_png(img, output)
    }

    /// Watermark an already decoded image and write it as PNG
    pub fn write_png(&self, img: DynamicImage, output: &Path) -> ProcessingResult<(u32, u32)> {
        let watermarked = self.apply(img);
        let dimensions = watermarked.dimensions();
        watermarked
            .save_with_format(output, ImageFormat::Png)
            .map_err(|e| ProcessingError::Encode(e.to_string()))?;
        Ok(dimensions)
    }
}

/// Decode raster image bytes. Empty input is a decode error.
pub fn decode_image(data: &[u8]) -> ProcessingResult<DynamicImage> {
    if data.is_empty() {
        return Err(ProcessingError::Decode("empty image data".to_string()));
    }
    image::load_from_memory(data).map_err(|e| ProcessingError::Decode(e.to_string()))
}
