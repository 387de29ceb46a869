#![allow(clippy::too_many_lines)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::unused_async)]

//! # Closet Cutout
//!
//! Turns photos of clothing into catalogue-ready cut-outs: a segmentation
//! model separates the garment from the background, the mask is cleaned
//! up, the item is cropped to its content, centred on a fixed transparent
//! canvas and optionally styled with an outline or shadows.
//!
//! ## Features
//!
//! - **Pluggable inference**: any [`InferenceBackend`]; ONNX Runtime ships behind the `onnx` feature
//! - **Mask clean-up**: blur, threshold and morphological close/open on the model output
//! - **Layout**: content crop with margin, aspect-preserving fit onto a padded canvas
//! - **Styles**: `magazine` (outline + drop shadow), `soft`, `ground` and `none`
//! - **External masks**: lay out items from masks produced elsewhere, including multi-item outfits
//! - **CLI Integration**: optional command-line interface (enable with `cli` feature)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use closet_cutout::{CutoutProcessor, OnnxBackend, PipelineConfig, Style};
//! use std::sync::Arc;
//!
//! # fn example() -> anyhow::Result<()> {
//! let config = PipelineConfig::builder().style(Style::Soft).build()?;
//! let backend = OnnxBackend::from_file("u2net.onnx", config.model_input_size, 4)?;
//! let processor = CutoutProcessor::new(Arc::new(backend), config)?;
//!
//! let result = processor.process_file("shirt.jpg", None)?;
//! result.save_png("shirt_cutout.png")?;
//! # Ok(())
//! # }
//! ```
//!
//! ### Feature Flags
//!
//! - `onnx` (default): ONNX Runtime inference backend
//! - `cli` (default): command-line interface and tracing subscriber setup
//! - `webp-support` (default): WebP input decoding
//! - `tracing-json`: JSON log output for the CLI
//!
//! ### Library-Only Usage
//!
//! ```toml
//! [dependencies]
//! closet-cutout = { version = "0.1", default-features = false, features = ["onnx"] }
//! ```

pub mod backends;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod effects;
pub mod error;
pub mod inference;
pub mod layout;
pub mod mask;
pub mod processor;
pub mod region;
pub mod services;
#[cfg(feature = "cli")]
pub mod tracing_config;
pub mod types;
pub mod utils;

use tokio::io::AsyncRead;

// Public API exports
pub use backends::*;
pub use config::{
    DropShadowParams, GroundShadowParams, LayoutConfig, MaskConfig, OutlineParams,
    PipelineConfig, PipelineConfigBuilder, Style, StyleParams,
};
pub use effects::apply_style;
pub use error::{CutoutError, Result};
pub use inference::InferenceBackend;
pub use mask::MaskNormalizer;
pub use processor::{build_item_from_mask, build_item_from_mask_files, compose_item, CutoutProcessor};
pub use region::{classify_region, deduplicate_masks, ExtractedItem, RegionExtractor, RegionLabel};
pub use services::ImageIOService;
pub use types::{BoundingBox, CutoutResult, ProcessingTimings};

#[cfg(feature = "cli")]
pub use tracing_config::{TracingConfig, TracingFormat};

/// Remove the background of an image read from an async stream
///
/// The stream is read to the end, decoded and run through `processor`.
/// `style` overrides the processor's configured default.
///
/// # Examples
///
/// ```rust,no_run
/// use closet_cutout::{remove_background_from_reader, CutoutProcessor, MockBackend, PipelineConfig};
/// use std::sync::Arc;
/// use tokio::fs::File;
///
/// # async fn example() -> anyhow::Result<()> {
/// let processor = CutoutProcessor::new(Arc::new(MockBackend::default()), PipelineConfig::default())?;
/// let file = File::open("dress.jpg").await?;
/// let result = remove_background_from_reader(file, &processor, None).await?;
/// result.save_png("dress.png")?;
/// # Ok(())
/// # }
/// ```
pub async fn remove_background_from_reader<R: AsyncRead + Unpin>(
    reader: R,
    processor: &CutoutProcessor,
    style: Option<Style>,
) -> Result<CutoutResult> {
    processor.process_reader(reader, style).await
}
