//! ONNX Runtime backend for clothing segmentation models
//!
//! The session is created once from a model file or in-memory bytes and then
//! shared between pipeline runs. ONNX Runtime needs exclusive access while a
//! run is in flight, so the session sits behind a mutex.

use crate::error::{CutoutError, Result};
use crate::inference::InferenceBackend;
use ndarray::{Array4, ArrayD};
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::{self, value::Value};
use std::path::Path;
use std::sync::Mutex;
use std::time::Instant;

/// ONNX Runtime backend for running segmentation models
#[derive(Debug)]
pub struct OnnxBackend {
    session: Mutex<Session>,
    input_size: (u32, u32),
    model_name: String,
}

impl OnnxBackend {
    /// Load a model from an `.onnx` file
    ///
    /// # Arguments
    /// * `path` - Model file
    /// * `input_size` - Model input size as (width, height)
    /// * `intra_threads` - Threads within operations; 0 uses all cores
    ///
    /// # Errors
    /// - `InputNotFound` when the model file is missing
    /// - `Inference` when ONNX Runtime rejects the model
    pub fn from_file<P: AsRef<Path>>(
        path: P,
        input_size: (u32, u32),
        intra_threads: usize,
    ) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(CutoutError::input_not_found("Model", path));
        }

        let load_start = Instant::now();
        let session = Self::session_builder(intra_threads)?
            .commit_from_file(path)
            .map_err(|e| CutoutError::inference("model loading", e))?;

        let model_name = path
            .file_stem()
            .map_or_else(|| "onnx".to_string(), |s| s.to_string_lossy().into_owned());
        log::info!(
            "📊 Model {} loaded in {:.0}ms",
            model_name,
            load_start.elapsed().as_secs_f64() * 1000.0
        );

        Ok(Self {
            session: Mutex::new(session),
            input_size,
            model_name,
        })
    }

    /// Load a model from bytes already in memory
    ///
    /// # Errors
    /// - `Inference` when ONNX Runtime rejects the model
    pub fn from_memory(model: &[u8], input_size: (u32, u32), intra_threads: usize) -> Result<Self> {
        let session = Self::session_builder(intra_threads)?
            .commit_from_memory(model)
            .map_err(|e| CutoutError::inference("model loading", e))?;
        log::debug!("Model loaded from {} bytes", model.len());

        Ok(Self {
            session: Mutex::new(session),
            input_size,
            model_name: "onnx".to_string(),
        })
    }

    fn session_builder(intra_threads: usize) -> Result<ort::session::builder::SessionBuilder> {
        // Optimal intra-op threads: all cores unless the caller pins a number
        let intra_threads = if intra_threads > 0 {
            intra_threads
        } else {
            std::thread::available_parallelism()
                .map(std::num::NonZero::get)
                .unwrap_or(4)
        };
        log::debug!("Session configuration: {intra_threads} intra-op threads, Level3 optimization");

        Session::builder()
            .map_err(|e| CutoutError::inference("session builder creation", e))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| CutoutError::inference("optimization level", e))?
            .with_intra_threads(intra_threads)
            .map_err(|e| CutoutError::inference("intra thread configuration", e))
    }
}

impl InferenceBackend for OnnxBackend {
    fn infer(&self, input: &Array4<f32>) -> Result<ArrayD<f32>> {
        let inference_start = Instant::now();
        log::debug!("🚀 Starting inference with input shape: {:?}", input.dim());

        let input_value = Value::from_array(input.clone())
            .map_err(|e| CutoutError::inference("input tensor conversion", e))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| CutoutError::inference("session lock", "ONNX session mutex poisoned"))?;

        // Positional inputs and outputs avoid depending on tensor names
        let outputs = session
            .run(ort::inputs![input_value])
            .map_err(|e| CutoutError::inference("model run", e))?;

        let first_key = outputs
            .keys()
            .next()
            .ok_or_else(|| CutoutError::inference("output extraction", "no output tensors"))?
            .to_string();
        let mask = outputs
            .get(first_key.as_str())
            .ok_or_else(|| CutoutError::inference("output extraction", "first output missing"))?
            .try_extract_array::<f32>()
            .map_err(|e| CutoutError::inference("output extraction", e))?
            .to_owned();

        log::info!(
            "📊 Inference complete: {:.2}ms, output shape {:?}",
            inference_start.elapsed().as_secs_f64() * 1000.0,
            mask.shape()
        );
        Ok(mask)
    }

    fn input_size(&self) -> (u32, u32) {
        self.input_size
    }

    fn name(&self) -> &str {
        &self.model_name
    }
}
