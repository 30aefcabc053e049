use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HindsightError {
    #[error("Episode not found: {0}")]
    EpisodeNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Embedding failed: {0}")]
    Embedding(String),

    #[error("Experience extraction failed: {0}")]
    Extraction(String),

    #[error("Corrupt experience record at {path}: {reason}")]
    CorruptRecord { path: PathBuf, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl HindsightError {
    /// Unknown-id lookups are a normal outcome (double-end, typo, restart),
    /// not a fault in the caller's control flow.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::EpisodeNotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, HindsightError>;
