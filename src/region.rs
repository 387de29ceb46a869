//! Region classification for multi-item outfit photos
//!
//! Masks come from an external general-purpose segmenter. Each one gets a
//! coarse garment label from where it sits vertically in the frame, near
//! duplicates are dropped, and every survivor is laid out as its own item.

use crate::{
    config::PipelineConfig,
    error::{CutoutError, Result},
    processor::build_item_from_mask,
    services::ImageIOService,
};
use image::{DynamicImage, GrayImage, RgbaImage};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Masks overlapping a kept mask by more than this mean (0-255 scale) are dropped
pub const OVERLAP_THRESHOLD: f64 = 5.0;

/// Coarse garment label derived from a region's vertical extent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionLabel {
    Top,
    Bottom,
    Shoes,
    FullBody,
    Accessory,
    Unknown,
}

impl RegionLabel {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Top => "top",
            Self::Bottom => "bottom",
            Self::Shoes => "shoes",
            Self::FullBody => "full_body",
            Self::Accessory => "accessory",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for RegionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a mask by the midpoint and height of its foreground rows
///
/// Rules, first match wins: height fraction above 0.8 is full body, a
/// midpoint above the 0.35 line is a top, above 0.65 a bottom, below 0.65
/// shoes. A midpoint of exactly 0.65 is an accessory; an empty mask is
/// unknown.
#[must_use]
pub fn classify_region(mask: &GrayImage) -> RegionLabel {
    let height = mask.height();
    let width = mask.width() as usize;
    let rows = mask
        .as_raw()
        .chunks(width.max(1))
        .enumerate()
        .filter(|(_, row)| row.iter().any(|&v| v > 0))
        .map(|(y, _)| y as u32);

    let (y_min, y_max) = match rows.fold(None, |acc: Option<(u32, u32)>, y| {
        Some(acc.map_or((y, y), |(lo, hi)| (lo.min(y), hi.max(y))))
    }) {
        Some(extent) => extent,
        None => return RegionLabel::Unknown,
    };

    let h = f64::from(height);
    let rel_mid = f64::from(y_min + y_max) / 2.0 / h;
    let rel_size = f64::from(y_max - y_min) / h;

    if rel_size > 0.8 {
        RegionLabel::FullBody
    } else if rel_mid < 0.35 {
        RegionLabel::Top
    } else if rel_mid < 0.65 {
        RegionLabel::Bottom
    } else if rel_mid > 0.65 {
        RegionLabel::Shoes
    } else {
        RegionLabel::Accessory
    }
}

/// Mean of the pixel-wise AND of two binarized masks, on a 0-255 scale
pub fn overlap_score(a: &GrayImage, b: &GrayImage) -> Result<f64> {
    if a.dimensions() != b.dimensions() {
        return Err(CutoutError::processing(format!(
            "Cannot compare masks of sizes {:?} and {:?}",
            a.dimensions(),
            b.dimensions()
        )));
    }
    let total = a.as_raw().len();
    if total == 0 {
        return Ok(0.0);
    }
    let both = a
        .as_raw()
        .iter()
        .zip(b.as_raw())
        .filter(|(x, y)| **x > 0 && **y > 0)
        .count();
    Ok(both as f64 * 255.0 / total as f64)
}

/// Keep masks in order, dropping any that overlap an already kept mask
///
/// # Errors
/// - `Processing` if the masks differ in size
pub fn deduplicate_masks(masks: Vec<GrayImage>) -> Result<Vec<GrayImage>> {
    let mut kept: Vec<GrayImage> = Vec::with_capacity(masks.len());
    for mask in masks {
        let mut duplicate = false;
        for existing in &kept {
            if overlap_score(&mask, existing)? > OVERLAP_THRESHOLD {
                duplicate = true;
                break;
            }
        }
        if !duplicate {
            kept.push(mask);
        }
    }
    Ok(kept)
}

/// One laid-out item extracted from an outfit photo
#[derive(Debug, Clone)]
pub struct ExtractedItem {
    pub index: usize,
    pub label: RegionLabel,
    /// Binary mask at the photo's resolution
    pub mask: GrayImage,
    /// Canvas-sized item
    pub image: RgbaImage,
}

impl ExtractedItem {
    /// File stem used when writing the item, e.g. `top_0`
    #[must_use]
    pub fn stem(&self) -> String {
        format!("{}_{}", self.label, self.index)
    }
}

/// Turns a set of region masks into labelled, laid-out items
#[derive(Debug, Clone, Default)]
pub struct RegionExtractor {
    config: PipelineConfig,
}

impl RegionExtractor {
    #[must_use]
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Deduplicate, classify and lay out every mask
    ///
    /// # Errors
    /// - `Processing` if the masks differ in size
    pub fn extract(
        &self,
        image: &DynamicImage,
        masks: Vec<GrayImage>,
        add_style: bool,
    ) -> Result<Vec<ExtractedItem>> {
        let raw_count = masks.len();
        let unique = deduplicate_masks(masks)?;
        info!(raw = raw_count, unique = unique.len(), "Deduplicated region masks");

        unique
            .into_iter()
            .enumerate()
            .map(|(index, mask)| {
                let label = classify_region(&mask);
                debug!(index, %label, "Laying out region");
                let item = build_item_from_mask(
                    image,
                    &DynamicImage::ImageLuma8(mask.clone()),
                    add_style,
                    &self.config,
                )?;
                Ok(ExtractedItem {
                    index,
                    label,
                    mask,
                    image: item,
                })
            })
            .collect()
    }

    /// Extract items and write `<label>_<i>.png` (mask) and
    /// `<label>_<i>_styled.png` (item) into `out_dir`
    ///
    /// # Errors
    /// - `InputNotFound` if the photo is missing
    /// - `Io` if the output directory cannot be written
    pub fn extract_to_dir<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        image_path: P,
        masks: Vec<GrayImage>,
        out_dir: Q,
    ) -> Result<Vec<PathBuf>> {
        let image = ImageIOService::load_image(image_path)?;
        let out_dir = out_dir.as_ref();

        let mut written = Vec::new();
        for item in self.extract(&image, masks, true)? {
            let stem = item.stem();
            ImageIOService::save_mask_png(&item.mask, out_dir.join(format!("{stem}.png")))?;
            let item_path = out_dir.join(format!("{stem}_styled.png"));
            ImageIOService::save_png(&item.image, &item_path)?;
            written.push(item_path);
        }
        info!(count = written.len(), dir = %out_dir.display(), "All items saved");
        Ok(written)
    }
}
