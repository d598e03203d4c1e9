//! Error types for training-state persistence.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for state persistence operations.
pub type StateResult<T> = std::result::Result<T, StateError>;

/// Errors that can occur while saving or restoring training state.
///
/// Every variant is fatal to the enclosing `save_state` / `load_state` call.
#[derive(Debug, Error)]
pub enum StateError {
    /// A required persisted artifact is absent.
    #[error("missing state file: {}", .0.display())]
    MissingStateFile(PathBuf),

    /// No backend is registered for the model's runtime type.
    #[error("unsupported model type for {model}: {kind}")]
    UnsupportedModelType { model: String, kind: String },

    /// Model weights artifact is absent.
    #[error("cannot find weights for model {model} at {}", .path.display())]
    MissingWeightsFile { model: String, path: PathBuf },

    /// Optimizer artifact is absent.
    #[error("cannot find optimizer state for model {model} at {}", .path.display())]
    MissingOptimizerFile { model: String, path: PathBuf },

    /// Persisted list length differs from the live collaborator count.
    #[error("expected {} to contain {expected} entries, found {found}", .path.display())]
    StateShapeMismatch { path: PathBuf, expected: usize, found: usize },

    /// Persisted mapping contains keys the live collaborators do not have.
    #[error("{} contained unexpected keys: {}", .path.display(), .keys.join(", "))]
    UnexpectedKey { path: PathBuf, keys: Vec<String> },

    /// Persisted blob does not have the expected structure.
    #[error("malformed state in {}: {reason}", .path.display())]
    MalformedState { path: PathBuf, reason: String },

    /// Invalid configuration value.
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    TomlDe(#[from] toml::de::Error),

    #[error(transparent)]
    TomlSer(#[from] toml::ser::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
