//! Error types for track generation

use thiserror::Error;

/// Main error type for the generator
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Extrusion already in progress for segment {0}")]
    ExtrusionBusy(u64),

    #[error("Extrusion error: {0}")]
    Extrusion(String),

    #[error("Level load error: {0}")]
    LevelLoad(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Template error: {0}")]
    Template(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
