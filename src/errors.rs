//! Error types for the classification pipeline.
//!
//! This module defines the errors that can occur while loading a model,
//! constructing an inference engine, building input tensors, and running
//! inference. It also provides utility constructors for creating these
//! errors with appropriate context.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Convenient result alias for classifier operations.
pub type ClassifierResult<T> = Result<T, ClassifierError>;

/// Enum representing the errors that can occur in the classification pipeline.
///
/// Every error is surfaced synchronously to the caller of the failing
/// operation; nothing is retried internally. Fallback policy (for example
/// dropping from an accelerator delegate back to CPU) is a caller decision.
#[derive(Error, Debug)]
pub enum ClassifierError {
    /// The model artifact is missing, unreadable, or corrupt at open time.
    ///
    /// Non-recoverable for this instance; the caller must not proceed to
    /// construct a classifier from the failed artifact.
    #[error("model load failed for '{path}': {context}")]
    ModelLoad {
        /// Path of the model artifact that failed to load.
        path: PathBuf,
        /// Additional context about the failure.
        context: String,
        /// The underlying error, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Backend or delegate construction failed.
    ///
    /// Typically the requested execution hardware is unavailable. The
    /// classifier leaves its previous working engine handle in place when a
    /// reconfiguration fails with this error.
    #[error("engine initialization failed: {context}")]
    EngineInit {
        /// Additional context about the failure.
        context: String,
        /// The underlying error, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// An operation was invoked before construction completed or after
    /// `close`.
    #[error("classifier not initialized: {operation} called on a closed instance")]
    NotInitialized {
        /// The operation that was attempted.
        operation: String,
    },

    /// The underlying execution call failed.
    ///
    /// Raised for malformed or mismatched input tensors, internal backend
    /// faults, and any use of an engine handle after it was closed.
    #[error("inference failed for model '{model_name}': {context}")]
    Inference {
        /// Name of the model the engine was built from.
        model_name: String,
        /// Additional context about the failure.
        context: String,
        /// The underlying error, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A configuration value was rejected.
    #[error("configuration: {message}")]
    InvalidConfig {
        /// A message describing the configuration error.
        message: String,
    },

    /// The supplied input was rejected before reaching the engine.
    #[error("invalid input: {message}")]
    InvalidInput {
        /// A message describing the invalid input.
        message: String,
    },
}

impl ClassifierError {
    /// Creates a `ModelLoad` error with path context and an optional source.
    pub fn model_load(
        path: impl AsRef<Path>,
        context: impl Into<String>,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::ModelLoad {
            path: path.as_ref().to_path_buf(),
            context: context.into(),
            source,
        }
    }

    /// Creates an `EngineInit` error from an underlying backend error.
    pub fn engine_init(
        context: impl Into<String>,
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::EngineInit {
            context: context.into(),
            source: Some(Box::new(error)),
        }
    }

    /// Creates an `EngineInit` error without an underlying source.
    pub fn engine_init_context(context: impl Into<String>) -> Self {
        Self::EngineInit {
            context: context.into(),
            source: None,
        }
    }

    /// Creates a `NotInitialized` error naming the attempted operation.
    pub fn not_initialized(operation: impl Into<String>) -> Self {
        Self::NotInitialized {
            operation: operation.into(),
        }
    }

    /// Creates an `Inference` error from an underlying engine error.
    pub fn inference(
        model_name: impl Into<String>,
        context: impl Into<String>,
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Inference {
            model_name: model_name.into(),
            context: context.into(),
            source: Some(Box::new(error)),
        }
    }

    /// Creates an `Inference` error without an underlying source.
    pub fn inference_context(
        model_name: impl Into<String>,
        context: impl Into<String>,
    ) -> Self {
        Self::Inference {
            model_name: model_name.into(),
            context: context.into(),
            source: None,
        }
    }

    /// Creates an `InvalidConfig` error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Creates an `InvalidInput` error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_load_display_includes_path_and_context() {
        let err = ClassifierError::model_load("models/missing.onnx", "file not found", None);
        let message = err.to_string();
        assert!(message.contains("models/missing.onnx"));
        assert!(message.contains("file not found"));
    }

    #[test]
    fn not_initialized_names_the_operation() {
        let err = ClassifierError::not_initialized("classify_frame");
        assert!(err.to_string().contains("classify_frame"));
    }

    #[test]
    fn inference_error_chains_the_source() {
        let io = std::io::Error::other("backend fault");
        let err = ClassifierError::inference("mobilenet", "forward pass", io);
        assert!(std::error::Error::source(&err).is_some());
    }
}
