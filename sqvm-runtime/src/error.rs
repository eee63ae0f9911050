//! Error types for the SQVM runtime

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid runtime configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error("no sqvm.toml found in {0} or any parent directory")]
    ConfigNotFound(PathBuf),

    #[error("invalid config tree at '{path}': {reason}")]
    InvalidConfigTree { path: String, reason: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("VM error: {0}")]
    Vm(#[from] sqvm_core::VmError),
}

pub type RuntimeResult<T> = Result<T, RuntimeError>;
