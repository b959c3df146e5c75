//! Error types for critplane-core

use thiserror::Error;

pub type Result<T> = std::result::Result<T, FatigueError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FatigueError {
    #[error("Invalid configuration: {field} {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    #[error("Stress series '{channel}' is empty")]
    EmptySeries { channel: String },

    #[error("Stress series '{channel}' has {len} samples, at least 3 are required")]
    SeriesTooShort { channel: String, len: usize },

    #[error("Signal has {len} samples, at least 3 are required")]
    SignalTooShort { len: usize },

    #[error("Orientation grid has no cells")]
    EmptyOrientationGrid,

    #[error("Stress tensor at sample {index} is not symmetric (deviation {deviation:e})")]
    NonSymmetricTensor { index: usize, deviation: f64 },

    #[error("Non-finite stress value at sample {index}")]
    NonFiniteSample { index: usize },

    #[error("Table shape error: {0}")]
    TableShape(String),

    #[error("Point ({x}, {y}) is outside the interpolation table")]
    OutOfTableRange { x: f64, y: f64 },

    #[error("Computation cancelled")]
    Cancelled,
}

impl FatigueError {
    pub(crate) fn config(field: &'static str, reason: impl Into<String>) -> Self {
        FatigueError::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }
}
