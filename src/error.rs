//! Typed errors for structurally invalid input.
//!
//! Noisy or missing field values never surface here; they are absorbed by the
//! normalizer and aggregator.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScoutError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ScoutError>;
