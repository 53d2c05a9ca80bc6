//! Typed error taxonomy shared by the pipeline stages.

use std::path::PathBuf;

use thiserror::Error;

/// Failure to obtain a usable settings record.
///
/// Always fatal: the pipeline aborts before touching the photo library.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No settings document could be located.
    #[error("configuration not found (looked in: {searched})")]
    NotFound {
        /// Human-readable list of the locations that were tried.
        searched: String,
    },

    /// The settings document exists but could not be read.
    #[error("failed to read configuration {}: {source}", path.display())]
    Read {
        /// Document path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The document is malformed or misses a required key.
    #[error("failed to parse configuration {origin}: {message}")]
    Parse {
        /// Where the document came from (a path or `<inline>`).
        origin: String,
        /// Parser message, including the offending key when known.
        message: String,
    },

    /// A key parsed but holds a value the pipeline cannot work with.
    #[error("invalid configuration value for `{key}`: {reason}")]
    Invalid {
        /// Dotted key name.
        key: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

/// Failure inside a detection backend.
#[derive(Debug, Error)]
pub enum InferenceError {
    /// Model weights are not present on disk.
    #[error("model file not found: {}", .0.display())]
    ModelNotFound(PathBuf),

    /// Weights exist but the network could not be built from them.
    #[error("failed to load {model}: {message}")]
    Load {
        /// Model name.
        model: &'static str,
        /// Backend message.
        message: String,
    },

    /// The forward pass or its post-processing failed.
    #[error("{model} inference failed: {message}")]
    Inference {
        /// Model name.
        model: &'static str,
        /// Backend message.
        message: String,
    },
}

impl InferenceError {
    pub(crate) fn load(model: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Load {
            model,
            message: err.to_string(),
        }
    }

    pub(crate) fn inference(model: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Inference {
            model,
            message: err.to_string(),
        }
    }
}
