//! Result and error types for Facefill.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for Facefill operations
pub type FacefillResult<T> = Result<T, FacefillError>;

/// Errors that can occur in Facefill
#[derive(Debug, Error)]
pub enum FacefillError {
    /// An image file could not be opened or decoded
    #[error("Failed to decode {}: {message}", path.display())]
    Decode {
        /// File that failed
        path: PathBuf,
        /// Error message
        message: String,
    },

    /// Two images handed to the metric functions differ in shape
    #[error("Shape mismatch: expected {expected:?} (h, w), got {actual:?}")]
    ShapeMismatch {
        /// Ground-truth shape (height, width)
        expected: (u32, u32),
        /// Prediction shape (height, width)
        actual: (u32, u32),
    },

    /// A resize was requested but the resized pair still differs
    #[error("Resize to {target:?} (h, w) produced {gt:?} and {pred:?}")]
    ResizeMismatch {
        /// Requested shape (height, width)
        target: (u32, u32),
        /// Resized ground-truth shape
        gt: (u32, u32),
        /// Resized prediction shape
        pred: (u32, u32),
    },

    /// Invalid configuration value
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Error message
        message: String,
    },

    /// Model inference failed for one input
    #[error("Inference failed for {}: {message}", path.display())]
    Inference {
        /// Input file
        path: PathBuf,
        /// Error message
        message: String,
    },

    /// Report could not be produced
    #[error("Report generation failed: {message}")]
    Report {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Image codec error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    /// Invalid glob pattern built from a directory or extension
    #[error("Invalid file pattern: {0}")]
    Pattern(#[from] glob::PatternError),
}

impl FacefillError {
    /// Create a decode error for `path`
    #[must_use]
    pub fn decode(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Decode {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create an inference error for `path`
    #[must_use]
    pub fn inference(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Inference {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a report error
    #[must_use]
    pub fn report(message: impl Into<String>) -> Self {
        Self::Report {
            message: message.into(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_error_names_file() {
        let err = FacefillError::decode("gt/face_01.jpg", "truncated");
        let msg = err.to_string();
        assert!(msg.contains("face_01.jpg"));
        assert!(msg.contains("truncated"));
    }

    #[test]
    fn test_resize_mismatch_message() {
        let err = FacefillError::ResizeMismatch {
            target: (256, 256),
            gt: (256, 256),
            pred: (255, 256),
        };
        assert!(err.to_string().contains("(255, 256)"));
    }

    #[test]
    fn test_io_error_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: FacefillError = io_err.into();
        assert!(err.to_string().contains("I/O"));
    }
}
