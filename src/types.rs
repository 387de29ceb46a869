//! Core types shared by the pipeline stages

use crate::{config::Style, error::Result};
use image::{GrayImage, RgbaImage};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Inclusive bounding box of non-transparent content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x_min: u32,
    pub y_min: u32,
    pub x_max: u32,
    pub y_max: u32,
}

impl BoundingBox {
    /// Width of the box, counting both edges
    #[must_use]
    pub fn width(&self) -> u32 {
        self.x_max - self.x_min + 1
    }

    /// Height of the box, counting both edges
    #[must_use]
    pub fn height(&self) -> u32 {
        self.y_max - self.y_min + 1
    }

    /// Whether the box spans the full extent of a `width` x `height` buffer
    #[must_use]
    pub fn covers(&self, width: u32, height: u32) -> bool {
        self.x_min == 0 && self.y_min == 0 && self.x_max + 1 == width && self.y_max + 1 == height
    }
}

/// Detailed timing breakdown for one pipeline run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingTimings {
    /// Image decoding from bytes or file
    pub image_decode_ms: u64,

    /// Tensor preparation for the model
    pub preprocessing_ms: u64,

    /// Inference collaborator call
    pub inference_ms: u64,

    /// Mask normalization and alpha assembly
    pub mask_ms: u64,

    /// Crop, canvas fit and style effects
    pub layout_ms: u64,

    /// Final encoding (if encoded)
    pub image_encode_ms: Option<u64>,

    /// Total end-to-end processing time
    pub total_ms: u64,
}

impl ProcessingTimings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fraction of the total spent in inference
    #[must_use]
    pub fn inference_ratio(&self) -> f64 {
        if self.total_ms == 0 {
            0.0
        } else {
            self.inference_ms as f64 / self.total_ms as f64
        }
    }

    /// One-line summary for display
    #[must_use]
    pub fn summary(&self) -> String {
        let mut summary = format!(
            "Total: {}ms | Decode: {}ms | Preprocess: {}ms | Inference: {}ms | Mask: {}ms | Layout: {}ms",
            self.total_ms,
            self.image_decode_ms,
            self.preprocessing_ms,
            self.inference_ms,
            self.mask_ms,
            self.layout_ms
        );
        if let Some(encode_ms) = self.image_encode_ms {
            summary.push_str(&format!(" | Encode: {}ms", encode_ms));
        }
        summary
    }
}

/// Result of a pipeline run
#[derive(Debug, Clone)]
pub struct CutoutResult {
    /// Final RGBA image (canvas-sized when layout was applied)
    pub image: RgbaImage,

    /// Alpha mask at original image resolution
    pub alpha: GrayImage,

    /// Original image dimensions
    pub original_dimensions: (u32, u32),

    /// Style that was applied, if layout ran
    pub style: Option<Style>,

    pub timings: ProcessingTimings,
}

impl CutoutResult {
    #[must_use]
    pub fn new(
        image: RgbaImage,
        alpha: GrayImage,
        original_dimensions: (u32, u32),
        style: Option<Style>,
        timings: ProcessingTimings,
    ) -> Self {
        Self {
            image,
            alpha,
            original_dimensions,
            style,
            timings,
        }
    }

    /// Output image dimensions
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Encode the image as PNG
    pub fn to_png_bytes(&self) -> Result<Vec<u8>> {
        crate::services::ImageIOService::encode_png(&self.image)
    }

    /// Save the image as PNG, creating parent directories
    pub fn save_png<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        crate::services::ImageIOService::save_png(&self.image, path)
    }

    /// Save the alpha mask as a grayscale PNG
    pub fn save_alpha_png<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        crate::services::ImageIOService::save_mask_png(&self.alpha, path)
    }

    /// Fraction of opaque pixels in the alpha mask
    #[must_use]
    pub fn foreground_ratio(&self) -> f32 {
        let total = self.alpha.as_raw().len();
        if total == 0 {
            return 0.0;
        }
        let foreground = self.alpha.as_raw().iter().filter(|&&a| a > 127).count();
        foreground as f32 / total as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgba};

    #[test]
    fn test_bounding_box_extent() {
        let bbox = BoundingBox {
            x_min: 10,
            y_min: 20,
            x_max: 19,
            y_max: 24,
        };
        assert_eq!(bbox.width(), 10);
        assert_eq!(bbox.height(), 5);
        assert!(!bbox.covers(20, 25));

        let full = BoundingBox {
            x_min: 0,
            y_min: 0,
            x_max: 19,
            y_max: 24,
        };
        assert!(full.covers(20, 25));
    }

    #[test]
    fn test_result_png_encoding() {
        let image = RgbaImage::from_pixel(4, 3, Rgba([10, 20, 30, 128]));
        let alpha = GrayImage::from_pixel(4, 3, Luma([255]));
        let result = CutoutResult::new(image, alpha, (4, 3), None, ProcessingTimings::new());

        let png = result.to_png_bytes().unwrap();
        let decoded = image::load_from_memory(&png).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (4, 3));
        assert_eq!(decoded.get_pixel(1, 1), &Rgba([10, 20, 30, 128]));
        assert!((result.foreground_ratio() - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_save_alpha_png_writes_mask() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("masks").join("shirt_mask.png");
        let alpha = GrayImage::from_fn(5, 4, |x, _| Luma([if x < 2 { 255 } else { 0 }]));
        let result = CutoutResult::new(RgbaImage::new(8, 8), alpha.clone(), (5, 4), None, ProcessingTimings::new());

        result.save_alpha_png(&path).unwrap();
        let loaded = image::open(&path).unwrap().to_luma8();
        assert_eq!(loaded, alpha);
    }

    #[test]
    fn test_timing_summary() {
        let timings = ProcessingTimings {
            inference_ms: 50,
            total_ms: 100,
            image_encode_ms: Some(7),
            ..ProcessingTimings::default()
        };
        assert!((timings.inference_ratio() - 0.5).abs() < f64::EPSILON);
        assert!(timings.summary().contains("Encode: 7ms"));
    }
}
