//! Inference backend abstraction
//!
//! The segmentation model is an external collaborator: a tensor goes in and
//! a raw probability mask comes out. Backends are constructed once and
//! injected into the processor, so they must be safe to share across
//! concurrent pipeline runs.

use crate::error::Result;
use ndarray::{Array4, ArrayD};

/// Trait for inference backends
pub trait InferenceBackend: Send + Sync {
    /// Run inference on a normalized NCHW input tensor
    ///
    /// The returned mask may carry leading singleton dimensions and any
    /// value range; the mask normalizer takes care of both.
    ///
    /// # Errors
    /// - Model inference failures (reported as `CutoutError::Inference`)
    /// - Output tensor extraction errors
    fn infer(&self, input: &Array4<f32>) -> Result<ArrayD<f32>>;

    /// Model input size as (width, height)
    fn input_size(&self) -> (u32, u32);

    /// Short human-readable backend name for logs
    fn name(&self) -> &str;
}
