//! Smoothing and thresholding filters on 8-bit buffers

use image::{GrayImage, RgbaImage};

/// Binomial weights of the 5-tap kernel, summing to 16
const BINOMIAL_5: [u32; 5] = [1, 4, 6, 4, 1];

/// Mirror an out-of-range index back into `0..len` without repeating the edge
/// sample (`gfedcb|abcdefgh|gfedcba`)
fn reflect_101(index: i64, len: usize) -> usize {
    let len = len as i64;
    if len == 1 {
        return 0;
    }
    let mut i = index;
    loop {
        if i < 0 {
            i = -i;
        } else if i >= len {
            i = 2 * len - 2 - i;
        } else {
            return i as usize;
        }
    }
}

/// Clamp an index to `0..len`
fn clamp_index(index: i64, len: usize) -> usize {
    index.clamp(0, len as i64 - 1) as usize
}

/// 5x5 Gaussian blur with the binomial kernel and reflected borders
///
/// Matches a 5x5 Gaussian whose sigma is derived from the kernel size. The
/// result is rounded with integer arithmetic so it is bit-reproducible.
#[must_use]
#[allow(clippy::indexing_slicing)]
// Indices pass through reflect_101 before every access
pub fn gaussian_blur_5x5(src: &GrayImage) -> GrayImage {
    let (width, height) = src.dimensions();
    let (w, h) = (width as usize, height as usize);
    if w == 0 || h == 0 {
        return src.clone();
    }
    let data = src.as_raw();

    let mut horizontal = vec![0u32; w * h];
    for y in 0..h {
        let row = &data[y * w..(y + 1) * w];
        for x in 0..w {
            horizontal[y * w + x] = BINOMIAL_5
                .iter()
                .enumerate()
                .map(|(k, weight)| weight * u32::from(row[reflect_101(x as i64 + k as i64 - 2, w)]))
                .sum();
        }
    }

    let mut out = vec![0u8; w * h];
    for y in 0..h {
        for x in 0..w {
            let sum: u32 = BINOMIAL_5
                .iter()
                .enumerate()
                .map(|(k, weight)| {
                    weight * horizontal[reflect_101(y as i64 + k as i64 - 2, h) * w + x]
                })
                .sum();
            out[y * w + x] = ((sum + 128) >> 8) as u8;
        }
    }

    GrayImage::from_raw(width, height, out).unwrap_or_else(|| GrayImage::new(width, height))
}

/// Binary threshold: values at or above `threshold` become 255, the rest 0
#[must_use]
pub fn threshold(src: &GrayImage, threshold: u8) -> GrayImage {
    let mut out = src.clone();
    for pixel in out.pixels_mut() {
        pixel.0[0] = if pixel.0[0] >= threshold { 255 } else { 0 };
    }
    out
}

/// Normalized 1-D Gaussian kernel with half-width `ceil(3 * sigma)`
fn gaussian_kernel(sigma: f32) -> Vec<f32> {
    let radius = (3.0 * sigma).ceil() as i64;
    let denom = 2.0 * sigma * sigma;
    let mut kernel: Vec<f32> = (-radius..=radius)
        .map(|i| (-((i * i) as f32) / denom).exp())
        .collect();
    let total: f32 = kernel.iter().sum();
    for weight in &mut kernel {
        *weight /= total;
    }
    kernel
}

#[allow(clippy::indexing_slicing)]
fn blur_plane(plane: &[f32], w: usize, h: usize, kernel: &[f32]) -> Vec<f32> {
    let radius = (kernel.len() / 2) as i64;

    let mut horizontal = vec![0f32; w * h];
    for y in 0..h {
        for x in 0..w {
            horizontal[y * w + x] = kernel
                .iter()
                .enumerate()
                .map(|(k, weight)| {
                    weight * plane[y * w + clamp_index(x as i64 + k as i64 - radius, w)]
                })
                .sum();
        }
    }

    let mut out = vec![0f32; w * h];
    for y in 0..h {
        for x in 0..w {
            out[y * w + x] = kernel
                .iter()
                .enumerate()
                .map(|(k, weight)| {
                    weight * horizontal[clamp_index(y as i64 + k as i64 - radius, h) * w + x]
                })
                .sum();
        }
    }
    out
}

/// Separable Gaussian blur of all four channels with edge-clamped borders
///
/// `sigma <= 0` returns a copy. Channels that are uniform across the buffer
/// are left untouched since blurring cannot change them.
#[must_use]
#[allow(clippy::indexing_slicing)]
pub fn gaussian_blur_rgba(src: &RgbaImage, sigma: f32) -> RgbaImage {
    let (width, height) = src.dimensions();
    let (w, h) = (width as usize, height as usize);
    if sigma <= 0.0 || w == 0 || h == 0 {
        return src.clone();
    }

    let kernel = gaussian_kernel(sigma);
    let mut out = src.clone();
    for channel in 0..4 {
        let plane: Vec<f32> = src.pixels().map(|p| f32::from(p.0[channel])).collect();
        if plane.iter().all(|&v| (v - plane[0]).abs() < f32::EPSILON) {
            continue;
        }
        let blurred = blur_plane(&plane, w, h, &kernel);
        for (pixel, value) in out.pixels_mut().zip(blurred) {
            pixel.0[channel] = value.round().clamp(0.0, 255.0) as u8;
        }
    }
    out
}
