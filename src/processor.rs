//! Cut-out pipeline orchestrator
//!
//! `CutoutProcessor` sequences inference, mask normalization, cropping,
//! canvas layout and styling for photos that need background removal.
//! `build_item_from_mask` runs the same layout stages for images that come
//! with an externally supplied binary mask.

use crate::{
    config::{LayoutConfig, PipelineConfig, Style, StyleParams},
    effects::apply_style,
    error::{CutoutError, Result},
    inference::InferenceBackend,
    layout::{crop_to_content, fit_on_canvas},
    mask::MaskNormalizer,
    services::ImageIOService,
    types::{CutoutResult, ProcessingTimings},
    utils::{resize_nearest, with_alpha, ImagePreprocessor},
};
use image::{DynamicImage, GrayImage, RgbaImage};
use instant::Instant;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument, span, Level};

/// Crop, fit to canvas and style an RGBA cut-out
///
/// # Errors
/// - Buffer invariant violations in the layout or effect stages
pub fn compose_item(
    rgba: &RgbaImage,
    layout: &LayoutConfig,
    style: Style,
    effects: &StyleParams,
) -> Result<RgbaImage> {
    let cropped = crop_to_content(rgba, layout.margin_ratio);
    let canvas = fit_on_canvas(&cropped, layout.canvas_size(), layout.padding)?;
    apply_style(&canvas, style, effects)
}

/// Main processor for background removal and item layout
///
/// The inference backend is injected once and shared; the processor itself
/// holds no per-request state, so `&self` methods may run concurrently.
pub struct CutoutProcessor {
    backend: Arc<dyn InferenceBackend>,
    config: PipelineConfig,
    normalizer: MaskNormalizer,
}

impl std::fmt::Debug for CutoutProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CutoutProcessor")
            .field("backend", &self.backend.name())
            .field("config", &self.config)
            .finish()
    }
}

impl CutoutProcessor {
    /// Create a processor around an already constructed backend
    ///
    /// # Errors
    /// - `InvalidConfig` when the configuration does not validate
    pub fn new(backend: Arc<dyn InferenceBackend>, config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let normalizer = MaskNormalizer::new(config.mask);
        info!(backend = backend.name(), style = %config.style, "Cut-out processor ready");
        Ok(Self {
            backend,
            config,
            normalizer,
        })
    }

    /// Get the current configuration
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Name of the injected backend
    #[must_use]
    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Run inference and mask normalization, returning the alpha channel at
    /// the image's own resolution
    ///
    /// # Errors
    /// - `Inference` if the backend fails
    /// - `InvalidMask` if the backend output cannot be reduced to 2-D
    pub fn segment(&self, image: &DynamicImage) -> Result<GrayImage> {
        let mut timings = ProcessingTimings::new();
        self.segment_timed(image, &mut timings)
    }

    fn segment_timed(&self, image: &DynamicImage, timings: &mut ProcessingTimings) -> Result<GrayImage> {
        let input_tensor = {
            let _span = span!(Level::DEBUG, "preprocessing").entered();
            let start = Instant::now();
            let tensor = ImagePreprocessor::preprocess(image, self.backend.input_size())?;
            timings.preprocessing_ms = start.elapsed().as_millis() as u64;
            tensor
        };

        let raw_mask = {
            let _span = span!(Level::INFO, "inference", backend = self.backend.name()).entered();
            let start = Instant::now();
            let raw = self.backend.infer(&input_tensor)?;
            timings.inference_ms = start.elapsed().as_millis() as u64;
            raw
        };

        let _span = span!(Level::DEBUG, "mask_normalization").entered();
        let start = Instant::now();
        let alpha = self
            .normalizer
            .normalize(&raw_mask, (image.width(), image.height()))?;
        timings.mask_ms = start.elapsed().as_millis() as u64;
        Ok(alpha)
    }

    /// Remove the background of a decoded image
    ///
    /// `style` overrides the configured default style for this call. When
    /// layout is disabled the cut-out keeps the original size and no style is
    /// applied.
    ///
    /// # Errors
    /// - `Inference` if the backend fails
    /// - `InvalidMask` if the backend output is malformed
    #[instrument(
        skip(self, image),
        fields(dimensions = %format!("{}x{}", image.width(), image.height()))
    )]
    pub fn process_image(&self, image: &DynamicImage, style: Option<Style>) -> Result<CutoutResult> {
        let total_start = Instant::now();
        let mut timings = ProcessingTimings::new();
        let original_dimensions = (image.width(), image.height());

        let alpha = self.segment_timed(image, &mut timings)?;
        let rgba = with_alpha(&image.to_rgba8(), &alpha)?;

        let (output, applied_style) = if self.config.apply_layout {
            let style = style.unwrap_or(self.config.style);
            let _span = span!(Level::DEBUG, "layout", %style).entered();
            let start = Instant::now();
            let composed = compose_item(&rgba, &self.config.layout, style, &self.config.effects)?;
            timings.layout_ms = start.elapsed().as_millis() as u64;
            (composed, Some(style))
        } else {
            (rgba, None)
        };

        timings.total_ms = total_start.elapsed().as_millis() as u64;
        debug!(timings = %timings.summary(), "Pipeline complete");

        Ok(CutoutResult::new(
            output,
            alpha,
            original_dimensions,
            applied_style,
            timings,
        ))
    }

    /// Decode and process image bytes
    ///
    /// # Errors
    /// - `Image` on decode failures, plus everything `process_image` reports
    pub fn process_bytes(&self, image_bytes: &[u8], style: Option<Style>) -> Result<CutoutResult> {
        let decode_start = Instant::now();
        let image = ImageIOService::load_from_bytes(image_bytes)?;
        let decode_ms = decode_start.elapsed().as_millis() as u64;

        let mut result = self.process_image(&image, style)?;
        result.timings.image_decode_ms = decode_ms;
        result.timings.total_ms += decode_ms;
        Ok(result)
    }

    /// Bytes in, PNG bytes out
    ///
    /// # Errors
    /// - `Image` on decode or encode failures
    /// - `Inference` if the backend fails
    pub fn remove_background(&self, image_bytes: &[u8], style: Option<Style>) -> Result<Vec<u8>> {
        let result = self.process_bytes(image_bytes, style)?;
        let encode_start = Instant::now();
        let png = result.to_png_bytes()?;
        debug!(
            encode_ms = encode_start.elapsed().as_millis() as u64,
            bytes = png.len(),
            "Encoded PNG"
        );
        Ok(png)
    }

    /// Upload entry point: the content type is checked before any decoding
    ///
    /// # Errors
    /// - `InvalidContentType` for anything other than `image/*`
    pub fn process_upload(
        &self,
        content_type: &str,
        image_bytes: &[u8],
        style: Option<Style>,
    ) -> Result<Vec<u8>> {
        ImageIOService::ensure_image_content_type(content_type)?;
        self.remove_background(image_bytes, style)
    }

    /// Load an image file and process it
    ///
    /// # Errors
    /// - `InputNotFound` if the file is missing
    pub fn process_file<P: AsRef<Path>>(&self, path: P, style: Option<Style>) -> Result<CutoutResult> {
        let decode_start = Instant::now();
        let image = ImageIOService::load_image(path)?;
        let decode_ms = decode_start.elapsed().as_millis() as u64;

        let mut result = self.process_image(&image, style)?;
        result.timings.image_decode_ms = decode_ms;
        result.timings.total_ms += decode_ms;
        Ok(result)
    }

    /// Read an async stream to the end and process its bytes
    ///
    /// # Errors
    /// - `Io` on stream read failures
    pub async fn process_reader<R: tokio::io::AsyncRead + Unpin>(
        &self,
        reader: R,
        style: Option<Style>,
    ) -> Result<CutoutResult> {
        let buffer = ImageIOService::read_all(reader).await?;
        self.process_bytes(&buffer, style)
    }
}

/// Lay out an image using an externally supplied binary mask
///
/// The mask is reduced to one 8-bit channel (wide or float masks are
/// binarized at `> 0`), resized with nearest-neighbour if its size differs,
/// and set as the alpha channel. The result is cropped, fitted to the
/// canvas and, when `add_style` is set, given the magazine style.
///
/// # Errors
/// - Buffer invariant violations in the layout or effect stages
pub fn build_item_from_mask(
    image: &DynamicImage,
    mask: &DynamicImage,
    add_style: bool,
    config: &PipelineConfig,
) -> Result<RgbaImage> {
    let (width, height) = (image.width(), image.height());
    let mut alpha = ImageIOService::mask_from_image(mask);
    if alpha.dimensions() != (width, height) {
        debug!(
            mask = ?alpha.dimensions(),
            image = ?(width, height),
            "Resizing mask to image size"
        );
        alpha = resize_nearest(&alpha, width, height);
    }

    let rgba = with_alpha(&image.to_rgba8(), &alpha)?;
    let style = if add_style { Style::Magazine } else { Style::None };
    compose_item(&rgba, &config.layout, style, &config.effects)
}

/// File variant of [`build_item_from_mask`]; returns the written path
///
/// Both inputs are checked before anything is decoded. Parent directories
/// of `out_path` are created as needed.
///
/// # Errors
/// - `InputNotFound` if the image or the mask is missing
pub fn build_item_from_mask_files<P, Q, R>(
    image_path: P,
    mask_path: Q,
    out_path: R,
    add_style: bool,
    config: &PipelineConfig,
) -> Result<PathBuf>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
    R: AsRef<Path>,
{
    let (image_path, mask_path) = (image_path.as_ref(), mask_path.as_ref());
    if !image_path.exists() {
        return Err(CutoutError::input_not_found("Image", image_path));
    }
    if !mask_path.exists() {
        return Err(CutoutError::input_not_found("Mask", mask_path));
    }

    let image = ImageIOService::load_image(image_path)?;
    let mask = DynamicImage::ImageLuma8(ImageIOService::load_mask(mask_path)?);
    let item = build_item_from_mask(&image, &mask, add_style, config)?;

    let out_path = out_path.as_ref().to_path_buf();
    ImageIOService::save_png(&item, &out_path)?;
    info!(path = %out_path.display(), "Saved item");
    Ok(out_path)
}
