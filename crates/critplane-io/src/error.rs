//! Error types for critplane-io

use critplane_core::FatigueError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, IoError>;

#[derive(Error, Debug)]
pub enum IoError {
    #[error("Invalid job: {0}")]
    InvalidJob(String),

    #[error("Unsupported report schema version {found} (expected {expected})")]
    SchemaVersion { found: u32, expected: u32 },

    #[error(transparent)]
    Core(#[from] FatigueError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
