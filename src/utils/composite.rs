//! Channel helpers and compositing operators for RGBA buffers

use crate::error::{CutoutError, Result};
use image::{GrayImage, Luma, Rgba, RgbaImage};

/// Rounded division by 255 for products of two 8-bit values
#[inline]
fn div255(value: u32) -> u8 {
    let tmp = value + 128;
    (((tmp >> 8) + tmp) >> 8) as u8
}

/// Blend one 8-bit channel towards `src` by `mask / 255`
#[inline]
fn blend(dst: u8, src: u8, mask: u8) -> u8 {
    let m = u32::from(mask);
    div255(u32::from(dst) * (255 - m) + u32::from(src) * m)
}

/// Extract the alpha channel of an RGBA buffer
#[must_use]
pub fn alpha_channel(image: &RgbaImage) -> GrayImage {
    let (width, height) = image.dimensions();
    GrayImage::from_fn(width, height, |x, y| Luma([image.get_pixel(x, y).0[3]]))
}

/// Replace the alpha channel of `image` with `alpha`
pub fn with_alpha(image: &RgbaImage, alpha: &GrayImage) -> Result<RgbaImage> {
    if image.dimensions() != alpha.dimensions() {
        return Err(CutoutError::processing(format!(
            "Alpha size {:?} does not match image size {:?}",
            alpha.dimensions(),
            image.dimensions()
        )));
    }
    let mut out = image.clone();
    for (pixel, a) in out.pixels_mut().zip(alpha.pixels()) {
        pixel.0[3] = a.0[0];
    }
    Ok(out)
}

/// Pixel-wise saturating subtraction `a - b`
pub fn subtract(a: &GrayImage, b: &GrayImage) -> Result<GrayImage> {
    if a.dimensions() != b.dimensions() {
        return Err(CutoutError::processing("Cannot subtract masks of different sizes"));
    }
    let data = a
        .as_raw()
        .iter()
        .zip(b.as_raw())
        .map(|(x, y)| x.saturating_sub(*y))
        .collect();
    GrayImage::from_raw(a.width(), a.height(), data)
        .ok_or_else(|| CutoutError::processing("Subtraction produced a malformed buffer"))
}

/// Paste `src` into `dst` at `offset`, weighting each pixel by `mask`
///
/// Every channel, alpha included, moves towards the source by `mask / 255`.
/// Parts of `src` that fall outside `dst` are clipped.
pub fn paste_with_mask(
    dst: &mut RgbaImage,
    src: &RgbaImage,
    mask: &GrayImage,
    offset: (i64, i64),
) -> Result<()> {
    if src.dimensions() != mask.dimensions() {
        return Err(CutoutError::processing(format!(
            "Paste mask size {:?} does not match source size {:?}",
            mask.dimensions(),
            src.dimensions()
        )));
    }

    let (dst_w, dst_h) = (i64::from(dst.width()), i64::from(dst.height()));
    for (x, y, pixel) in src.enumerate_pixels() {
        let tx = i64::from(x) + offset.0;
        let ty = i64::from(y) + offset.1;
        if tx < 0 || ty < 0 || tx >= dst_w || ty >= dst_h {
            continue;
        }
        let m = mask.get_pixel(x, y).0[0];
        if m == 0 {
            continue;
        }
        let target = dst.get_pixel_mut(tx as u32, ty as u32);
        for (d, s) in target.0.iter_mut().zip(pixel.0) {
            *d = blend(*d, s, m);
        }
    }
    Ok(())
}

/// Fill `dst` with a solid colour wherever `mask` is set
pub fn fill_with_mask(dst: &mut RgbaImage, color: [u8; 4], mask: &GrayImage) -> Result<()> {
    let solid = RgbaImage::from_pixel(dst.width(), dst.height(), Rgba(color));
    paste_with_mask(dst, &solid, mask, (0, 0))
}

/// Composite `src` over `dst` with the straight-alpha over operator
pub fn alpha_composite(dst: &RgbaImage, src: &RgbaImage) -> Result<RgbaImage> {
    if dst.dimensions() != src.dimensions() {
        return Err(CutoutError::processing(
            "Cannot alpha-composite buffers of different sizes",
        ));
    }

    let mut out = dst.clone();
    for (o, s) in out.pixels_mut().zip(src.pixels()) {
        let src_a = f32::from(s.0[3]) / 255.0;
        let dst_a = f32::from(o.0[3]) / 255.0;
        let out_a = src_a + dst_a * (1.0 - src_a);
        if out_a <= 0.0 {
            *o = Rgba([0, 0, 0, 0]);
            continue;
        }
        for c in 0..3 {
            let value = (f32::from(s.0[c]) * src_a + f32::from(o.0[c]) * dst_a * (1.0 - src_a))
                / out_a;
            o.0[c] = value.round().clamp(0.0, 255.0) as u8;
        }
        o.0[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_div255_rounds() {
        assert_eq!(div255(0), 0);
        assert_eq!(div255(255 * 255), 255);
        assert_eq!(div255(255 * 128), 128);
        assert_eq!(div255(127), 0);
        assert_eq!(div255(128), 1);
    }

    #[test]
    fn test_paste_full_mask_replaces() {
        let mut dst = RgbaImage::new(4, 4);
        let src = RgbaImage::from_pixel(2, 2, Rgba([10, 20, 30, 40]));
        let mask = GrayImage::from_pixel(2, 2, Luma([255]));
        paste_with_mask(&mut dst, &src, &mask, (1, 1)).unwrap();

        assert_eq!(dst.get_pixel(1, 1), &Rgba([10, 20, 30, 40]));
        assert_eq!(dst.get_pixel(2, 2), &Rgba([10, 20, 30, 40]));
        assert_eq!(dst.get_pixel(0, 0), &Rgba([0, 0, 0, 0]));
        assert_eq!(dst.get_pixel(3, 3), &Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn test_paste_partial_mask_blends_alpha_too() {
        let mut dst = RgbaImage::new(1, 1);
        let src = RgbaImage::from_pixel(1, 1, Rgba([200, 100, 0, 255]));
        let mask = GrayImage::from_pixel(1, 1, Luma([128]));
        paste_with_mask(&mut dst, &src, &mask, (0, 0)).unwrap();
        assert_eq!(dst.get_pixel(0, 0), &Rgba([100, 50, 0, 128]));
    }

    #[test]
    fn test_paste_clips_out_of_bounds() {
        let mut dst = RgbaImage::new(3, 3);
        let src = RgbaImage::from_pixel(3, 3, Rgba([1, 2, 3, 255]));
        let mask = GrayImage::from_pixel(3, 3, Luma([255]));
        paste_with_mask(&mut dst, &src, &mask, (2, -2)).unwrap();

        assert_eq!(dst.get_pixel(2, 0), &Rgba([1, 2, 3, 255]));
        assert_eq!(dst.pixels().filter(|p| p.0[3] == 255).count(), 1);
    }

    #[test]
    fn test_paste_rejects_mismatched_mask() {
        let mut dst = RgbaImage::new(3, 3);
        let src = RgbaImage::new(2, 2);
        let mask = GrayImage::new(3, 2);
        assert!(paste_with_mask(&mut dst, &src, &mask, (0, 0)).is_err());
    }

    #[test]
    fn test_alpha_composite_over() {
        let dst = RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 255]));
        let src = RgbaImage::from_pixel(1, 1, Rgba([255, 255, 255, 0]));
        let out = alpha_composite(&dst, &src).unwrap();
        assert_eq!(out.get_pixel(0, 0), &Rgba([0, 0, 0, 255]));

        let src = RgbaImage::from_pixel(1, 1, Rgba([200, 0, 0, 255]));
        let out = alpha_composite(&dst, &src).unwrap();
        assert_eq!(out.get_pixel(0, 0), &Rgba([200, 0, 0, 255]));

        let transparent = RgbaImage::new(1, 1);
        let half = RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 128]));
        let out = alpha_composite(&transparent, &half).unwrap();
        assert_eq!(out.get_pixel(0, 0), &Rgba([0, 0, 0, 128]));
    }

    #[test]
    fn test_channel_helpers() {
        let image = RgbaImage::from_pixel(2, 1, Rgba([9, 9, 9, 50]));
        let alpha = alpha_channel(&image);
        assert_eq!(alpha.as_raw(), &vec![50, 50]);

        let replaced = with_alpha(&image, &GrayImage::from_raw(2, 1, vec![0, 255]).unwrap()).unwrap();
        assert_eq!(replaced.get_pixel(1, 0), &Rgba([9, 9, 9, 255]));

        let a = GrayImage::from_raw(3, 1, vec![255, 100, 0]).unwrap();
        let b = GrayImage::from_raw(3, 1, vec![255, 40, 10]).unwrap();
        assert_eq!(subtract(&a, &b).unwrap().as_raw(), &vec![0, 60, 0]);
    }
}
