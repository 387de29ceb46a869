//! Backend implementations for different inference engines
//!
//! This module provides the backends for the cut-out pipeline:
//! - ONNX Runtime backend (segmentation model from an `.onnx` file)
//! - Mock backend (deterministic masks, no model files)

#[cfg(feature = "onnx")]
pub mod onnx;

pub mod mock;

// Re-export backends based on enabled features
#[cfg(feature = "onnx")]
pub use self::onnx::OnnxBackend;

pub use self::mock::MockBackend;
