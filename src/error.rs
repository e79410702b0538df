//! Error types for the I/O boundary.
//!
//! The derivation engine itself never fails; these cover reading snapshots,
//! loading configuration, and writing exports.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error("unsupported output format: {0}")]
    UnsupportedFormat(String),
}

pub type Result<T> = std::result::Result<T, Error>;
