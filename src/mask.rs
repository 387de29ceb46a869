//! Mask normalization: raw model output to a clean binary alpha channel

use crate::{
    config::MaskConfig,
    error::{CutoutError, Result},
    utils::{close, dilate, erode, gaussian_blur_5x5, resize_bilinear, threshold},
};
use image::GrayImage;
use ndarray::{Array2, ArrayD};
use tracing::debug;

/// Guard added to the value range so constant masks never divide by zero
pub const NORMALIZATION_EPSILON: f32 = 1e-8;

/// Reduce a raw mask to two dimensions
///
/// Singleton axes are dropped. A mask whose only non-singleton axes are its
/// last two (e.g. `1x1x1xW`) keeps those two axes.
///
/// # Errors
/// - `InvalidMask` for empty masks, non-finite values, or more than two
///   non-singleton axes
pub fn squeeze_to_2d(raw: &ArrayD<f32>) -> Result<Array2<f32>> {
    let shape = raw.shape();
    if raw.is_empty() {
        return Err(CutoutError::invalid_mask(format!("empty mask with shape {:?}", shape)));
    }
    if raw.iter().any(|v| !v.is_finite()) {
        return Err(CutoutError::invalid_mask("mask contains NaN or infinite values"));
    }

    let significant: Vec<usize> = shape.iter().copied().filter(|&d| d != 1).collect();
    let (height, width) = match significant.as_slice() {
        [h, w] => (*h, *w),
        _ if shape.len() >= 2 && shape.iter().rev().skip(2).all(|&d| d == 1) => {
            (shape[shape.len() - 2], shape[shape.len() - 1])
        },
        _ => {
            return Err(CutoutError::invalid_mask(format!(
                "cannot squeeze mask with shape {:?} to two dimensions",
                shape
            )))
        },
    };

    // Logical iteration order keeps rows contiguous once singleton axes are gone
    let data: Vec<f32> = raw.iter().copied().collect();
    Array2::from_shape_vec((height, width), data)
        .map_err(|e| CutoutError::invalid_mask(format!("reshape failed: {}", e)))
}

/// Min-max normalize to `[0, 1]`, scale by 255 and truncate to 8 bits
#[must_use]
pub fn to_u8_range(mask: &Array2<f32>) -> GrayImage {
    let (height, width) = mask.dim();
    let (min, max) = mask
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let range = max - min + NORMALIZATION_EPSILON;

    let data: Vec<u8> = mask
        .iter()
        .map(|&v| (((v - min) / range) * 255.0) as u8)
        .collect();
    GrayImage::from_raw(width as u32, height as u32, data)
        .unwrap_or_else(|| GrayImage::new(width as u32, height as u32))
}

/// Converts raw probability masks into binary alpha channels
#[derive(Debug, Clone, Default)]
pub struct MaskNormalizer {
    config: MaskConfig,
}

impl MaskNormalizer {
    #[must_use]
    pub fn new(config: MaskConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &MaskConfig {
        &self.config
    }

    /// Normalize `raw` into an alpha channel of `target_size` (width, height)
    ///
    /// Every output pixel is 0 or 255. A constant mask yields an all-zero
    /// alpha.
    pub fn normalize(&self, raw: &ArrayD<f32>, target_size: (u32, u32)) -> Result<GrayImage> {
        let (width, height) = target_size;
        if width == 0 || height == 0 {
            return Err(CutoutError::processing_stage_error(
                "mask normalization",
                "target size must be non-zero",
            ));
        }

        let squeezed = squeeze_to_2d(raw)?;
        debug!(
            mask_height = squeezed.nrows(),
            mask_width = squeezed.ncols(),
            width,
            height,
            "Normalizing mask"
        );

        let scaled = to_u8_range(&squeezed);
        let resized = resize_bilinear(&scaled, width, height);
        Ok(self.clean(&resized))
    }

    /// Smooth, threshold and run the morphology sequence on an 8-bit mask
    #[must_use]
    pub fn clean(&self, mask: &GrayImage) -> GrayImage {
        let smoothed = if self.config.blur_kernel == 5 {
            gaussian_blur_5x5(mask)
        } else {
            mask.clone()
        };
        let binary = threshold(&smoothed, self.config.threshold);
        let closed = close(&binary, self.config.close_iterations);
        erode(&dilate(&closed, 1), 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::IxDyn;

    fn rect_mask(h: usize, w: usize, top: usize, left: usize, size: usize) -> ArrayD<f32> {
        ArrayD::from_shape_fn(IxDyn(&[1, 1, h, w]), |idx| {
            let (y, x) = (idx[2], idx[3]);
            if (top..top + size).contains(&y) && (left..left + size).contains(&x) {
                0.9
            } else {
                0.1
            }
        })
    }

    #[test]
    fn test_squeeze_leading_singletons() {
        let raw = ArrayD::<f32>::zeros(IxDyn(&[1, 1, 6, 4]));
        assert_eq!(squeeze_to_2d(&raw).unwrap().dim(), (6, 4));

        let raw = ArrayD::<f32>::zeros(IxDyn(&[6, 1, 4]));
        assert_eq!(squeeze_to_2d(&raw).unwrap().dim(), (6, 4));

        let raw = ArrayD::<f32>::zeros(IxDyn(&[1, 1, 1, 4]));
        assert_eq!(squeeze_to_2d(&raw).unwrap().dim(), (1, 4));
    }

    #[test]
    fn test_squeeze_rejects_bad_masks() {
        let raw = ArrayD::<f32>::zeros(IxDyn(&[2, 3, 4]));
        assert!(matches!(squeeze_to_2d(&raw), Err(CutoutError::InvalidMask(_))));

        let raw = ArrayD::<f32>::zeros(IxDyn(&[1, 0, 4]));
        assert!(matches!(squeeze_to_2d(&raw), Err(CutoutError::InvalidMask(_))));

        let mut raw = ArrayD::<f32>::zeros(IxDyn(&[3, 3]));
        raw[[1, 1]] = f32::NAN;
        assert!(matches!(squeeze_to_2d(&raw), Err(CutoutError::InvalidMask(_))));
    }

    #[test]
    fn test_u8_range_spans_full_scale() {
        let mask = Array2::from_shape_vec((1, 3), vec![-2.0, 0.0, 2.0]).unwrap();
        let out = to_u8_range(&mask);
        assert_eq!(out.as_raw()[0], 0);
        assert_eq!(out.as_raw()[1], 127);
        // 255 * (1 - tiny) truncates to 254
        assert!(out.as_raw()[2] >= 254);
    }

    #[test]
    fn test_constant_mask_is_empty_not_nan() {
        let raw = ArrayD::from_elem(IxDyn(&[1, 1, 30, 40]), 5.0f32);
        let alpha = MaskNormalizer::default().normalize(&raw, (80, 60)).unwrap();
        assert_eq!(alpha.dimensions(), (80, 60));
        assert!(alpha.pixels().all(|p| p.0[0] == 0));
    }

    #[test]
    fn test_output_is_binary_at_target_size() {
        let raw = rect_mask(40, 40, 10, 10, 20);
        let alpha = MaskNormalizer::default().normalize(&raw, (123, 77)).unwrap();
        assert_eq!(alpha.dimensions(), (123, 77));
        assert!(alpha.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
        assert_eq!(alpha.get_pixel(61, 38).0[0], 255);
        assert_eq!(alpha.get_pixel(2, 2).0[0], 0);
    }

    #[test]
    fn test_clean_fills_small_holes() {
        let mut mask = GrayImage::new(30, 30);
        for y in 5..25 {
            for x in 5..25 {
                mask.put_pixel(x, y, image::Luma([255]));
            }
        }
        mask.put_pixel(15, 15, image::Luma([0]));
        let normalizer = MaskNormalizer::new(MaskConfig {
            blur_kernel: 1,
            ..MaskConfig::default()
        });
        let cleaned = normalizer.clean(&mask);
        assert_eq!(cleaned.get_pixel(15, 15).0[0], 255);
        assert_eq!(cleaned.get_pixel(2, 2).0[0], 0);
    }

    #[test]
    fn test_zero_target_size_rejected() {
        let raw = rect_mask(8, 8, 2, 2, 4);
        assert!(MaskNormalizer::default().normalize(&raw, (0, 8)).is_err());
    }
}
