//! Image I/O operations service
//!
//! This module separates file and upload handling from the pipeline
//! stages: existence checks, content-type validation, mask decoding and PNG
//! output all live here.

use crate::error::{CutoutError, Result};
use image::{codecs::png::PngEncoder, DynamicImage, GrayImage, ImageEncoder, Luma, RgbaImage};
use std::path::Path;

/// Service for handling image file input/output operations
pub struct ImageIOService;

impl ImageIOService {
    /// Load an image from a file path
    ///
    /// # Arguments
    /// * `path` - Path to the image file
    ///
    /// # Errors
    /// - `InputNotFound` if the file does not exist
    /// - `Image` if neither extension nor content detection can decode it
    ///
    /// # Examples
    /// ```rust,no_run
    /// use closet_cutout::services::ImageIOService;
    ///
    /// let image = ImageIOService::load_image("outfit.jpg")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load_image<P: AsRef<Path>>(path: P) -> Result<DynamicImage> {
        Self::load_existing("Image", path.as_ref())
    }

    /// Load an externally supplied mask as a single 8-bit channel
    ///
    /// # Errors
    /// - `InputNotFound` if the file does not exist
    /// - `Image` on decode failures
    pub fn load_mask<P: AsRef<Path>>(path: P) -> Result<GrayImage> {
        let mask = Self::load_existing("Mask", path.as_ref())?;
        Ok(Self::mask_from_image(&mask))
    }

    fn load_existing(kind: &'static str, path: &Path) -> Result<DynamicImage> {
        if !path.exists() {
            return Err(CutoutError::input_not_found(kind, path));
        }

        // First try to load the image using extension-based format detection
        match image::open(path) {
            Ok(img) => Ok(img),
            Err(e) => {
                tracing::debug!(
                    "Extension-based loading failed for {}: {}. Attempting content-based detection.",
                    path.display(),
                    e
                );
                let data = std::fs::read(path)?;
                Ok(image::load_from_memory(&data)?)
            },
        }
    }

    /// Reduce a decoded mask image to one 8-bit channel
    ///
    /// 8-bit sources are converted to luma as-is. Higher bit depths and float
    /// sources are binarized: any value above zero becomes 255.
    #[must_use]
    pub fn mask_from_image(mask: &DynamicImage) -> GrayImage {
        let (width, height) = (mask.width(), mask.height());
        match mask {
            DynamicImage::ImageLuma16(_)
            | DynamicImage::ImageLumaA16(_)
            | DynamicImage::ImageRgb16(_)
            | DynamicImage::ImageRgba16(_) => {
                let wide = mask.to_luma16();
                GrayImage::from_fn(width, height, |x, y| {
                    Luma([if wide.get_pixel(x, y).0[0] > 0 { 255 } else { 0 }])
                })
            },
            DynamicImage::ImageRgb32F(_) | DynamicImage::ImageRgba32F(_) => {
                let float = mask.to_luma32f();
                GrayImage::from_fn(width, height, |x, y| {
                    Luma([if float.get_pixel(x, y).0[0] > 0.0 { 255 } else { 0 }])
                })
            },
            _ => mask.to_luma8(),
        }
    }

    /// Reject uploads whose content type is not `image/*`
    ///
    /// Parameters such as `; charset=...` are ignored and the comparison is
    /// case-insensitive.
    pub fn ensure_image_content_type(content_type: &str) -> Result<()> {
        let media_type = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match media_type.strip_prefix("image/") {
            Some(subtype) if !subtype.is_empty() => Ok(()),
            _ => Err(CutoutError::invalid_content_type(content_type)),
        }
    }

    /// Check if a file path has a supported image extension
    pub fn is_supported_format<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_lowercase)
            .is_some_and(|ext| {
                matches!(
                    ext.as_str(),
                    "jpg" | "jpeg" | "png" | "webp" | "tiff" | "tif" | "bmp"
                )
            })
    }

    /// Load an image from bytes
    pub fn load_from_bytes(bytes: &[u8]) -> Result<DynamicImage> {
        Ok(image::load_from_memory(bytes)?)
    }

    /// Read an async stream to the end and return its bytes
    pub async fn read_all<R: tokio::io::AsyncRead + Unpin>(mut reader: R) -> Result<Vec<u8>> {
        use tokio::io::AsyncReadExt;

        let mut buffer = Vec::new();
        AsyncReadExt::read_to_end(&mut reader, &mut buffer).await?;
        Ok(buffer)
    }

    /// Encode an RGBA buffer as PNG bytes
    pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        PngEncoder::new(&mut buffer).write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            image::ExtendedColorType::Rgba8,
        )?;
        Ok(buffer)
    }

    /// Save an RGBA buffer as PNG, creating parent directories
    pub fn save_png<P: AsRef<Path>>(image: &RgbaImage, path: P) -> Result<()> {
        let path = path.as_ref();
        Self::create_parent_dirs(path)?;
        image.save_with_format(path, image::ImageFormat::Png)?;
        Ok(())
    }

    /// Save a single-channel mask as PNG, creating parent directories
    pub fn save_mask_png<P: AsRef<Path>>(mask: &GrayImage, path: P) -> Result<()> {
        let path = path.as_ref();
        Self::create_parent_dirs(path)?;
        mask.save_with_format(path, image::ImageFormat::Png)?;
        Ok(())
    }

    fn create_parent_dirs(path: &Path) -> Result<()> {
        match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => {
                std::fs::create_dir_all(parent)?;
                Ok(())
            },
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgba};
    use tempfile::tempdir;

    #[test]
    fn test_is_supported_format() {
        assert!(ImageIOService::is_supported_format("test.jpg"));
        assert!(ImageIOService::is_supported_format("test.JPEG"));
        assert!(ImageIOService::is_supported_format("test.png"));
        assert!(ImageIOService::is_supported_format("test.webp"));
        assert!(ImageIOService::is_supported_format("test.tif"));

        assert!(!ImageIOService::is_supported_format("test.txt"));
        assert!(!ImageIOService::is_supported_format("test"));
    }

    #[test]
    fn test_load_nonexistent_file() {
        let err = ImageIOService::load_image("nonexistent.jpg").unwrap_err();
        assert!(matches!(err, CutoutError::InputNotFound { kind: "Image", .. }));

        let err = ImageIOService::load_mask("nonexistent_mask.png").unwrap_err();
        assert!(matches!(err, CutoutError::InputNotFound { kind: "Mask", .. }));
    }

    #[test]
    fn test_content_type_gate() {
        assert!(ImageIOService::ensure_image_content_type("image/png").is_ok());
        assert!(ImageIOService::ensure_image_content_type("IMAGE/JPEG; q=0.9").is_ok());

        for bad in ["text/plain", "application/octet-stream", "image/", "", "imagepng"] {
            let err = ImageIOService::ensure_image_content_type(bad).unwrap_err();
            assert!(matches!(err, CutoutError::InvalidContentType(_)), "{bad}");
        }
    }

    #[test]
    fn test_wide_masks_are_binarized() {
        let wide: ImageBuffer<Luma<u16>, Vec<u16>> =
            ImageBuffer::from_raw(3, 1, vec![0, 1, 65535]).unwrap();
        let mask = ImageIOService::mask_from_image(&DynamicImage::ImageLuma16(wide));
        assert_eq!(mask.as_raw(), &vec![0, 255, 255]);

        let narrow = GrayImage::from_raw(3, 1, vec![0, 1, 200]).unwrap();
        let mask = ImageIOService::mask_from_image(&DynamicImage::ImageLuma8(narrow));
        assert_eq!(mask.as_raw(), &vec![0, 1, 200]);
    }

    #[test]
    fn test_png_roundtrip_keeps_alpha() {
        let image = RgbaImage::from_fn(3, 2, |x, _| Rgba([x as u8, 0, 0, (x * 100) as u8]));
        let bytes = ImageIOService::encode_png(&image).unwrap();
        let decoded = ImageIOService::load_from_bytes(&bytes).unwrap().to_rgba8();
        assert_eq!(decoded, image);
    }

    #[test]
    fn test_save_png_creates_directory() {
        let temp_dir = tempdir().unwrap();
        let nested_path = temp_dir.path().join("nested").join("dir").join("item.png");

        ImageIOService::save_png(&RgbaImage::new(2, 2), &nested_path).unwrap();
        assert!(nested_path.exists());

        let mask_path = temp_dir.path().join("masks").join("top_0.png");
        ImageIOService::save_mask_png(&GrayImage::new(2, 2), &mask_path).unwrap();
        let loaded = ImageIOService::load_mask(&mask_path).unwrap();
        assert_eq!(loaded.dimensions(), (2, 2));
    }

    #[tokio::test]
    async fn test_read_all_from_stream() {
        let data = vec![1u8, 2, 3, 4];
        let bytes = ImageIOService::read_all(std::io::Cursor::new(data.clone()))
            .await
            .unwrap();
        assert_eq!(bytes, data);
    }
}
