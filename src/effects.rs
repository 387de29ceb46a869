//! Stylization effects: outline, drop shadow and ground shadow
//!
//! Every effect takes an RGBA buffer and returns a new buffer of the same
//! size. Effects that draw outside the item (outline ring, shadows) rely on
//! the transparent margin left by the canvas layout.

use crate::{
    config::{DropShadowParams, GroundShadowParams, OutlineParams, Style, StyleParams},
    error::Result,
    utils::{
        alpha_channel, alpha_composite, dilate, fill_with_mask, gaussian_blur_rgba,
        paste_with_mask, subtract,
    },
};
use image::{GrayImage, RgbaImage};
use tracing::{debug, instrument};

/// Draw a solid ring of `params.thickness` pixels around the silhouette
///
/// The alpha is grown with a 3x3 max filter once per pixel of thickness, the
/// original alpha is subtracted to leave the ring, and the item is pasted
/// back on top.
pub fn add_outline(image: &RgbaImage, params: &OutlineParams) -> Result<RgbaImage> {
    let alpha = alpha_channel(image);
    let grown = dilate(&alpha, params.thickness);
    let ring = subtract(&grown, &alpha)?;

    let mut out = RgbaImage::new(image.width(), image.height());
    fill_with_mask(&mut out, params.color, &ring)?;
    paste_with_mask(&mut out, image, &alpha, (0, 0))?;
    Ok(out)
}

/// Soft shadow: the silhouette in `params.color`, blurred and offset behind the item
pub fn add_drop_shadow(image: &RgbaImage, params: &DropShadowParams) -> Result<RgbaImage> {
    let (width, height) = image.dimensions();
    let alpha = alpha_channel(image);

    let mut shadow = RgbaImage::new(width, height);
    fill_with_mask(&mut shadow, params.color, &alpha)?;
    let shadow = gaussian_blur_rgba(&shadow, params.blur_radius);

    let mut out = RgbaImage::new(width, height);
    let (dx, dy) = params.offset;
    paste_with_mask(&mut out, &shadow, &alpha_channel(&shadow), (i64::from(dx), i64::from(dy)))?;
    paste_with_mask(&mut out, image, &alpha, (0, 0))?;
    Ok(out)
}

/// Shadow alpha cast straight down from the item's silhouette
///
/// For each shift `i` in `1..max_shift` (where `max_shift = floor(height *
/// spread)`) the alpha is moved down `i` rows and accumulated with weight
/// `1 - i / max_shift`. The sum is scaled by `intensity`, clipped to
/// `[0, 1]` and stored as 8-bit alpha.
#[must_use]
#[allow(clippy::indexing_slicing)]
// Row indices stay below `height` and column indices below `width`
pub fn ground_shadow_alpha(alpha: &GrayImage, params: &GroundShadowParams) -> GrayImage {
    let (width, height) = alpha.dimensions();
    let (w, h) = (width as usize, height as usize);
    let max_shift = (f64::from(height) * f64::from(params.spread)) as usize;
    let mut out = GrayImage::new(width, height);
    if max_shift < 2 || w == 0 {
        return out;
    }

    // Running sums over the window of the `k` rows above y:
    //   plain(y)    = sum a[y - i]
    //   weighted(y) = sum i * a[y - i]
    // so shadow(y) = plain(y) - weighted(y) / max_shift
    let k = max_shift - 1;
    let m = max_shift as f64;
    let intensity = f64::from(params.intensity);
    let data = alpha.as_raw();

    let mut plain = vec![0f64; w];
    let mut weighted = vec![0f64; w];
    let out_data: &mut [u8] = &mut out;

    for y in 0..h {
        let target = &mut out_data[y * w..(y + 1) * w];
        for x in 0..w {
            let shadow = plain[x] - weighted[x] / m;
            let value = (shadow * intensity).clamp(0.0, 1.0);
            target[x] = (value * 255.0) as u8;
        }

        // Advance the window to y + 1
        let entering = &data[y * w..(y + 1) * w];
        let leaving = if y >= k {
            Some(&data[(y - k) * w..(y - k + 1) * w])
        } else {
            None
        };
        for x in 0..w {
            let a_in = f64::from(entering[x]) / 255.0;
            let a_out = leaving.map_or(0.0, |r| f64::from(r[x]) / 255.0);
            let old_plain = plain[x];
            plain[x] = old_plain + a_in - a_out;
            weighted[x] = a_in + weighted[x] + old_plain - (k as f64 + 1.0) * a_out;
        }
    }
    out
}

/// Composite a downward gradient shadow underneath the item
pub fn add_ground_shadow(image: &RgbaImage, params: &GroundShadowParams) -> Result<RgbaImage> {
    let shadow_alpha = ground_shadow_alpha(&alpha_channel(image), params);
    let shadow = RgbaImage::from_fn(image.width(), image.height(), |x, y| {
        image::Rgba([0, 0, 0, shadow_alpha.get_pixel(x, y).0[0]])
    });
    alpha_composite(&shadow, image)
}

/// Apply the effects a style stands for
///
/// - `Magazine`: outline, then drop shadow
/// - `Soft`: drop shadow
/// - `Ground`: ground shadow
/// - `None`: unchanged copy
#[instrument(skip(image, params), fields(width = image.width(), height = image.height()))]
pub fn apply_style(image: &RgbaImage, style: Style, params: &StyleParams) -> Result<RgbaImage> {
    debug!("Applying style");
    match style {
        Style::Magazine => {
            let outlined = add_outline(image, &params.outline)?;
            add_drop_shadow(&outlined, &params.drop_shadow)
        },
        Style::Soft => add_drop_shadow(image, &params.drop_shadow),
        Style::Ground => add_ground_shadow(image, &params.ground_shadow),
        Style::None => Ok(image.clone()),
    }
}
