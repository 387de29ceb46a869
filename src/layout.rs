//! Content cropping and canvas layout

use crate::{
    error::{CutoutError, Result},
    types::BoundingBox,
    utils::{alpha_channel, paste_with_mask},
};
use image::{imageops::FilterType, RgbaImage};
use tracing::debug;

/// Bounding box of every pixel whose alpha is above zero
///
/// Returns `None` for a fully transparent buffer.
#[must_use]
pub fn content_bounds(image: &RgbaImage) -> Option<BoundingBox> {
    let mut bounds: Option<BoundingBox> = None;
    for (x, y, pixel) in image.enumerate_pixels() {
        if pixel.0[3] == 0 {
            continue;
        }
        bounds = Some(match bounds {
            None => BoundingBox {
                x_min: x,
                y_min: y,
                x_max: x,
                y_max: y,
            },
            Some(b) => BoundingBox {
                x_min: b.x_min.min(x),
                y_min: b.y_min.min(y),
                x_max: b.x_max.max(x),
                y_max: b.y_max.max(y),
            },
        });
    }
    bounds
}

/// Content bounds grown by `margin_ratio` of their own size, clamped to the image
#[must_use]
pub fn crop_bounds(image: &RgbaImage, margin_ratio: f32) -> Option<BoundingBox> {
    let bbox = content_bounds(image)?;
    let margin = f64::from(margin_ratio);
    let mx = (f64::from(bbox.width()) * margin) as u32;
    let my = (f64::from(bbox.height()) * margin) as u32;

    Some(BoundingBox {
        x_min: bbox.x_min.saturating_sub(mx),
        y_min: bbox.y_min.saturating_sub(my),
        x_max: bbox.x_max.saturating_add(mx).min(image.width() - 1),
        y_max: bbox.y_max.saturating_add(my).min(image.height() - 1),
    })
}

/// Crop to the non-transparent content plus a margin
///
/// A fully transparent input is returned unchanged.
#[must_use]
pub fn crop_to_content(image: &RgbaImage, margin_ratio: f32) -> RgbaImage {
    match crop_bounds(image, margin_ratio) {
        Some(b) => {
            debug!(?b, "Cropping to content");
            image::imageops::crop_imm(image, b.x_min, b.y_min, b.width(), b.height()).to_image()
        },
        None => {
            debug!("No visible content, skipping crop");
            image.clone()
        },
    }
}

/// Size an item of `item_size` takes on a canvas after padding
///
/// Items are only ever scaled down, never up, and are at least 1x1.
#[must_use]
pub fn fitted_size(item_size: (u32, u32), canvas_size: (u32, u32), padding: u32) -> (u32, u32) {
    let (item_w, item_h) = item_size;
    let (canvas_w, canvas_h) = canvas_size;
    let avail_w = canvas_w.saturating_sub(padding.saturating_mul(2)).max(1);
    let avail_h = canvas_h.saturating_sub(padding.saturating_mul(2)).max(1);

    let scale = (f64::from(avail_w) / f64::from(item_w.max(1)))
        .min(f64::from(avail_h) / f64::from(item_h.max(1)))
        .min(1.0);

    let new_w = ((f64::from(item_w) * scale) as u32).max(1);
    let new_h = ((f64::from(item_h) * scale) as u32).max(1);
    (new_w, new_h)
}

/// Centre the item on a transparent canvas, shrinking it to fit inside the padding
///
/// # Errors
/// - Zero-sized item or canvas
pub fn fit_on_canvas(image: &RgbaImage, canvas_size: (u32, u32), padding: u32) -> Result<RgbaImage> {
    let (canvas_w, canvas_h) = canvas_size;
    if image.width() == 0 || image.height() == 0 || canvas_w == 0 || canvas_h == 0 {
        return Err(CutoutError::processing_stage_error(
            "canvas layout",
            "item and canvas must be non-empty",
        ));
    }

    let (new_w, new_h) = fitted_size(image.dimensions(), canvas_size, padding);
    let resized = if (new_w, new_h) == image.dimensions() {
        image.clone()
    } else {
        let premultiplied = premultiply(image);
        unpremultiply(image::imageops::resize(&premultiplied, new_w, new_h, FilterType::Lanczos3))
    };

    let mut canvas = RgbaImage::new(canvas_w, canvas_h);
    let offset_x = (i64::from(canvas_w) - i64::from(new_w)) / 2;
    let offset_y = (i64::from(canvas_h) - i64::from(new_h)) / 2;
    debug!(new_w, new_h, offset_x, offset_y, "Placing item on canvas");

    paste_with_mask(&mut canvas, &resized, &alpha_channel(&resized), (offset_x, offset_y))?;
    Ok(canvas)
}

/// Scale colour by alpha so hidden pixels cannot bleed into the item edge
fn premultiply(image: &RgbaImage) -> RgbaImage {
    let mut out = image.clone();
    for pixel in out.pixels_mut() {
        let a = u32::from(pixel.0[3]);
        for c in &mut pixel.0[..3] {
            *c = ((u32::from(*c) * a + 127) / 255) as u8;
        }
    }
    out
}

fn unpremultiply(mut image: RgbaImage) -> RgbaImage {
    for pixel in image.pixels_mut() {
        let a = u32::from(pixel.0[3]);
        if a == 0 {
            pixel.0 = [0, 0, 0, 0];
            continue;
        }
        for c in &mut pixel.0[..3] {
            *c = ((u32::from(*c) * 255 + a / 2) / a).min(255) as u8;
        }
    }
    image
}
