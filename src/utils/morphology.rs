//! Binary morphology with a 3x3 all-ones structuring element
//!
//! Samples outside the buffer are ignored, so they never win a max or a min.
//! The square element is separable: a row pass followed by a column pass
//! gives the same result as the full 3x3 window.

use image::GrayImage;

#[derive(Debug, Clone, Copy)]
enum Extremum {
    Max,
    Min,
}

impl Extremum {
    fn pick(self, a: u8, b: u8) -> u8 {
        match self {
            Self::Max => a.max(b),
            Self::Min => a.min(b),
        }
    }
}

#[allow(clippy::indexing_slicing)]
// Neighbour indices are bounds-checked before use
fn pass_3x3(src: &GrayImage, op: Extremum) -> GrayImage {
    let (width, height) = src.dimensions();
    let (w, h) = (width as usize, height as usize);
    let data = src.as_raw();

    let mut rows = data.clone();
    for y in 0..h {
        for x in 0..w {
            let mut value = data[y * w + x];
            if x > 0 {
                value = op.pick(value, data[y * w + x - 1]);
            }
            if x + 1 < w {
                value = op.pick(value, data[y * w + x + 1]);
            }
            rows[y * w + x] = value;
        }
    }

    let mut out = rows.clone();
    for y in 0..h {
        for x in 0..w {
            let mut value = rows[y * w + x];
            if y > 0 {
                value = op.pick(value, rows[(y - 1) * w + x]);
            }
            if y + 1 < h {
                value = op.pick(value, rows[(y + 1) * w + x]);
            }
            out[y * w + x] = value;
        }
    }

    GrayImage::from_raw(width, height, out).unwrap_or_else(|| src.clone())
}

/// Grow the foreground `iterations` times (3x3 max filter)
#[must_use]
pub fn dilate(src: &GrayImage, iterations: u32) -> GrayImage {
    (0..iterations).fold(src.clone(), |acc, _| pass_3x3(&acc, Extremum::Max))
}

/// Shrink the foreground `iterations` times (3x3 min filter)
#[must_use]
pub fn erode(src: &GrayImage, iterations: u32) -> GrayImage {
    (0..iterations).fold(src.clone(), |acc, _| pass_3x3(&acc, Extremum::Min))
}

/// Morphological close: `iterations` dilations followed by as many erosions
#[must_use]
pub fn close(src: &GrayImage, iterations: u32) -> GrayImage {
    erode(&dilate(src, iterations), iterations)
}
