//! Image preprocessing for model inference

use crate::error::{CutoutError, Result};
use image::{DynamicImage, RgbImage};
use ndarray::Array4;

/// Shared image preprocessing utilities
pub struct ImagePreprocessor;

impl ImagePreprocessor {
    /// Build the model input tensor for `image`
    ///
    /// This function handles:
    /// - RGB conversion
    /// - Bilinear resize to the model's input size (aspect ratio is not kept)
    /// - Scaling to `[0, 1]`
    /// - Channel-first layout with a batch dimension of 1 (NCHW)
    ///
    /// # Arguments
    /// * `image` - Input image to preprocess
    /// * `input_size` - Model input size as (width, height)
    ///
    /// # Errors
    /// - Zero-sized target dimensions
    pub fn preprocess(image: &DynamicImage, input_size: (u32, u32)) -> Result<Array4<f32>> {
        let (target_width, target_height) = input_size;
        if target_width == 0 || target_height == 0 {
            return Err(CutoutError::config_value_error(
                "model_input_size",
                format!("{}x{}", target_width, target_height),
                "both dimensions > 0",
            ));
        }

        let rgb_image = image.to_rgb8();
        let resized = if rgb_image.dimensions() == input_size {
            rgb_image
        } else {
            image::imageops::resize(
                &rgb_image,
                target_width,
                target_height,
                image::imageops::FilterType::Triangle,
            )
        };

        Ok(Self::image_to_tensor(&resized))
    }

    /// Convert an RGB buffer to a normalized NCHW tensor
    fn image_to_tensor(image: &RgbImage) -> Array4<f32> {
        let (width, height) = image.dimensions();
        let mut tensor = Array4::<f32>::zeros((1, 3, height as usize, width as usize));

        #[allow(clippy::indexing_slicing)]
        // Safe: tensor dimensions pre-allocated to match the image size
        for (y, row) in image.rows().enumerate() {
            for (x, pixel) in row.enumerate() {
                tensor[[0, 0, y, x]] = f32::from(pixel[0]) / 255.0;
                tensor[[0, 1, y, x]] = f32::from(pixel[1]) / 255.0;
                tensor[[0, 2, y, x]] = f32::from(pixel[2]) / 255.0;
            }
        }

        tensor
    }
}
