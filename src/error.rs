//! Error types for cut-out pipeline operations

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias for cut-out pipeline operations
pub type Result<T> = std::result::Result<T, CutoutError>;

/// Boxed cause attached to inference failures
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error types for the cut-out pipeline
#[derive(Error, Debug)]
pub enum CutoutError {
    /// Input/output errors (permission denied, disk full, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image decoding or encoding errors
    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    /// A referenced image or mask file does not exist
    #[error("{kind} not found: {}", path.display())]
    InputNotFound {
        /// What the missing file was supposed to be ("Image", "Mask", ...)
        kind: &'static str,
        path: PathBuf,
    },

    /// Uploaded content is not an image
    #[error("Invalid content type: {0} (expected image/*)")]
    InvalidContentType(String),

    /// Raw mask cannot be interpreted as a single-channel 2-D buffer
    #[error("Invalid mask: {0}")]
    InvalidMask(String),

    /// The inference collaborator failed
    #[error("Inference failed during {context}: {source}")]
    Inference {
        context: String,
        #[source]
        source: BoxError,
    },

    /// Invalid configuration or parameters
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Buffer invariants violated during processing
    #[error("Processing error: {0}")]
    Processing(String),
}

impl CutoutError {
    /// Create a new invalid configuration error
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a new invalid mask error
    pub fn invalid_mask<S: Into<String>>(msg: S) -> Self {
        Self::InvalidMask(msg.into())
    }

    /// Create a new processing error
    pub fn processing<S: Into<String>>(msg: S) -> Self {
        Self::Processing(msg.into())
    }

    /// Create a new content type error
    pub fn invalid_content_type<S: Into<String>>(content_type: S) -> Self {
        Self::InvalidContentType(content_type.into())
    }

    /// Create a missing-input error for the given path
    pub fn input_not_found<P: AsRef<Path>>(kind: &'static str, path: P) -> Self {
        Self::InputNotFound {
            kind,
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Wrap a collaborator failure, keeping the underlying cause
    pub fn inference<S, E>(context: S, source: E) -> Self
    where
        S: Into<String>,
        E: Into<BoxError>,
    {
        Self::Inference {
            context: context.into(),
            source: source.into(),
        }
    }

    /// Create configuration error with valid ranges
    pub fn config_value_error<T: std::fmt::Display>(
        parameter: &str,
        value: T,
        valid_range: &str,
    ) -> Self {
        Self::InvalidConfig(format!(
            "Invalid {}: {} (valid range: {})",
            parameter, value, valid_range
        ))
    }

    /// Create processing error with stage context
    pub fn processing_stage_error(stage: &str, details: &str) -> Self {
        Self::Processing(format!("Processing failed at stage '{}': {}", stage, details))
    }

    /// Whether this error came from the inference collaborator
    #[must_use]
    pub fn is_inference_failure(&self) -> bool {
        matches!(self, Self::Inference { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_error_creation() {
        let err = CutoutError::invalid_config("test config error");
        assert!(matches!(err, CutoutError::InvalidConfig(_)));

        let err = CutoutError::invalid_content_type("text/plain");
        assert!(matches!(err, CutoutError::InvalidContentType(_)));
    }

    #[test]
    fn test_error_display() {
        let err = CutoutError::invalid_config("canvas too small");
        assert_eq!(err.to_string(), "Invalid configuration: canvas too small");

        let err = CutoutError::input_not_found("Mask", "/tmp/missing_mask.png");
        assert_eq!(err.to_string(), "Mask not found: /tmp/missing_mask.png");
    }

    #[test]
    fn test_inference_error_keeps_source() {
        let cause = std::io::Error::new(std::io::ErrorKind::Other, "session exploded");
        let err = CutoutError::inference("model run", cause);

        assert!(err.is_inference_failure());
        assert!(err.to_string().contains("model run"));
        let source = err.source().expect("source attached");
        assert_eq!(source.to_string(), "session exploded");
    }

    #[test]
    fn test_config_value_error() {
        let err = CutoutError::config_value_error("margin_ratio", 1.5, "[0, 1)");
        let text = err.to_string();
        assert!(text.contains("margin_ratio"));
        assert!(text.contains("1.5"));
        assert!(text.contains("[0, 1)"));
    }
}
