//! Mock backend implementation for testing and debugging

use crate::error::{CutoutError, Result};
use crate::inference::InferenceBackend;
use ndarray::{Array4, ArrayD, IxDyn};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

type MaskFn = dyn Fn(&Array4<f32>) -> ArrayD<f32> + Send + Sync;

/// What the mock produces for each call
#[derive(Clone)]
enum MockMask {
    /// Every pixel gets the same value
    Uniform(f32),
    /// A centred rectangle covering `fraction` of each axis is `high`, the rest `low`
    CenteredRect { fraction: f32, low: f32, high: f32 },
    /// Caller-supplied mask function
    Custom(Arc<MaskFn>),
    /// Every call fails with this message
    Failing(String),
}

impl std::fmt::Debug for MockMask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Uniform(v) => write!(f, "Uniform({})", v),
            Self::CenteredRect { fraction, low, high } => {
                write!(f, "CenteredRect({}, {}..{})", fraction, low, high)
            },
            Self::Custom(_) => write!(f, "Custom"),
            Self::Failing(msg) => write!(f, "Failing({})", msg),
        }
    }
}

/// Mock backend for testing and debugging purposes
///
/// Produces deterministic masks shaped `(1, 1, H, W)` after the input tensor,
/// so the whole pipeline can run without model files.
#[derive(Debug)]
pub struct MockBackend {
    mask: MockMask,
    input_size: (u32, u32),
    calls: AtomicUsize,
}

impl MockBackend {
    fn with_mask(mask: MockMask) -> Self {
        Self {
            mask,
            input_size: (64, 48),
            calls: AtomicUsize::new(0),
        }
    }

    /// Constant mask; normalizes to an empty alpha
    #[must_use]
    pub fn uniform(value: f32) -> Self {
        Self::with_mask(MockMask::Uniform(value))
    }

    /// Foreground rectangle in the middle of the frame
    #[must_use]
    pub fn centered_rect(fraction: f32) -> Self {
        Self::with_mask(MockMask::CenteredRect {
            fraction,
            low: -4.0,
            high: 6.0,
        })
    }

    /// Mask computed by a closure from the input tensor
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&Array4<f32>) -> ArrayD<f32> + Send + Sync + 'static,
    {
        Self::with_mask(MockMask::Custom(Arc::new(f)))
    }

    /// Backend whose every call fails
    #[must_use]
    pub fn failing<S: Into<String>>(message: S) -> Self {
        Self::with_mask(MockMask::Failing(message.into()))
    }

    /// Override the reported model input size (width, height)
    #[must_use]
    pub fn with_input_size(mut self, width: u32, height: u32) -> Self {
        self.input_size = (width, height);
        self
    }

    /// Number of `infer` calls so far
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn rect_mask(h: usize, w: usize, fraction: f32, low: f32, high: f32) -> ArrayD<f32> {
        let fraction = fraction.clamp(0.0, 1.0);
        let rect_h = (h as f32 * fraction).round() as usize;
        let rect_w = (w as f32 * fraction).round() as usize;
        let top = (h - rect_h.min(h)) / 2;
        let left = (w - rect_w.min(w)) / 2;

        ArrayD::from_shape_fn(IxDyn(&[1, 1, h, w]), |idx| {
            let (y, x) = (idx[2], idx[3]);
            if (top..top + rect_h).contains(&y) && (left..left + rect_w).contains(&x) {
                high
            } else {
                low
            }
        })
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::centered_rect(0.5)
    }
}

impl InferenceBackend for MockBackend {
    fn infer(&self, input: &Array4<f32>) -> Result<ArrayD<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let (_n, _c, h, w) = input.dim();

        match &self.mask {
            MockMask::Uniform(value) => Ok(ArrayD::from_elem(IxDyn(&[1, 1, h, w]), *value)),
            MockMask::CenteredRect { fraction, low, high } => {
                Ok(Self::rect_mask(h, w, *fraction, *low, *high))
            },
            MockMask::Custom(f) => Ok(f(input)),
            MockMask::Failing(message) => Err(CutoutError::inference(
                "mock inference",
                std::io::Error::new(std::io::ErrorKind::Other, message.clone()),
            )),
        }
    }

    fn input_size(&self) -> (u32, u32) {
        self.input_size
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_mask_shape() {
        let backend = MockBackend::uniform(5.0);
        let mask = backend.infer(&Array4::zeros((1, 3, 12, 20))).unwrap();
        assert_eq!(mask.shape(), &[1, 1, 12, 20]);
        assert!(mask.iter().all(|&v| (v - 5.0).abs() < f32::EPSILON));
        assert_eq!(backend.calls(), 1);
    }

    #[test]
    fn test_centered_rect_mask() {
        let backend = MockBackend::centered_rect(0.5);
        let mask = backend.infer(&Array4::zeros((1, 3, 8, 8))).unwrap();
        assert!(mask[[0, 0, 4, 4]] > 0.0);
        assert!(mask[[0, 0, 0, 0]] < 0.0);
        assert_eq!(mask.iter().filter(|&&v| v > 0.0).count(), 16);
    }

    #[test]
    fn test_failing_backend_reports_inference_error() {
        let backend = MockBackend::failing("weights missing");
        let err = backend.infer(&Array4::zeros((1, 3, 2, 2))).unwrap_err();
        assert!(err.is_inference_failure());
        assert!(err.to_string().contains("weights missing"));
    }

    #[test]
    fn test_from_fn_receives_input() {
        let backend = MockBackend::from_fn(|input| {
            input.index_axis(ndarray::Axis(1), 0).to_owned().into_dyn()
        })
        .with_input_size(3, 2);
        let mut input = Array4::zeros((1, 3, 2, 3));
        input[[0, 0, 1, 2]] = 0.5;

        let mask = backend.infer(&input).unwrap();
        assert_eq!(mask.shape(), &[1, 2, 3]);
        assert!((mask[[0, 1, 2]] - 0.5).abs() < f32::EPSILON);
        assert_eq!(backend.input_size(), (3, 2));
    }
}
