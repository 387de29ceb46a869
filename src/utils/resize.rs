//! Single-channel resampling with fixed pixel semantics
//!
//! Both filters map destination pixel centres onto the source grid, so the
//! output only depends on the two sizes and never on the resampler of the
//! image crate in use.

use image::GrayImage;

/// Source coordinate of a destination pixel centre for the given scale
fn source_center(dst: u32, scale: f64) -> f64 {
    (f64::from(dst) + 0.5) * scale - 0.5
}

/// Precomputed neighbour pair and weight for one output coordinate
#[derive(Debug, Clone, Copy)]
struct Tap {
    lo: usize,
    hi: usize,
    weight: f32,
}

fn bilinear_taps(src_len: u32, dst_len: u32) -> Vec<Tap> {
    let scale = f64::from(src_len) / f64::from(dst_len);
    let last = src_len.saturating_sub(1) as usize;

    (0..dst_len)
        .map(|d| {
            let pos = source_center(d, scale).max(0.0);
            let lo = (pos.floor() as usize).min(last);
            let hi = (lo + 1).min(last);
            let weight = if lo == last { 0.0 } else { (pos - lo as f64) as f32 };
            Tap { lo, hi, weight }
        })
        .collect()
}

/// Bilinear resize with half-pixel centres, clamped edges and rounding
#[must_use]
#[allow(clippy::indexing_slicing)]
// Tap indices are clamped to the source extent when computed
pub fn resize_bilinear(src: &GrayImage, width: u32, height: u32) -> GrayImage {
    let (src_w, src_h) = src.dimensions();
    if (src_w, src_h) == (width, height) {
        return src.clone();
    }
    if src_w == 0 || src_h == 0 {
        return GrayImage::new(width, height);
    }

    let x_taps = bilinear_taps(src_w, width);
    let y_taps = bilinear_taps(src_h, height);
    let stride = src_w as usize;
    let data = src.as_raw();

    let mut out = GrayImage::new(width, height);
    for (y, row) in out.rows_mut().enumerate() {
        let ty = y_taps[y];
        let top = &data[ty.lo * stride..(ty.lo + 1) * stride];
        let bottom = &data[ty.hi * stride..(ty.hi + 1) * stride];

        for (x, pixel) in row.enumerate() {
            let tx = x_taps[x];
            let upper = f32::from(top[tx.lo]) * (1.0 - tx.weight) + f32::from(top[tx.hi]) * tx.weight;
            let lower =
                f32::from(bottom[tx.lo]) * (1.0 - tx.weight) + f32::from(bottom[tx.hi]) * tx.weight;
            let value = upper * (1.0 - ty.weight) + lower * ty.weight;
            pixel.0[0] = value.round().clamp(0.0, 255.0) as u8;
        }
    }
    out
}

/// Nearest-neighbour resize; never introduces new values into a binary mask
#[must_use]
pub fn resize_nearest(src: &GrayImage, width: u32, height: u32) -> GrayImage {
    let (src_w, src_h) = src.dimensions();
    if (src_w, src_h) == (width, height) {
        return src.clone();
    }
    if src_w == 0 || src_h == 0 {
        return GrayImage::new(width, height);
    }

    let scale_x = f64::from(src_w) / f64::from(width);
    let scale_y = f64::from(src_h) / f64::from(height);
    let pick = |d: u32, scale: f64, len: u32| -> u32 {
        (((f64::from(d) + 0.5) * scale).floor() as u32).min(len - 1)
    };

    GrayImage::from_fn(width, height, |x, y| {
        *src.get_pixel(pick(x, scale_x, src_w), pick(y, scale_y, src_h))
    })
}
