//! Error type for the fallible edges of the crate (config and catalog loading)

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MatcherError {
    #[error("invalid matcher config: {0}")]
    InvalidConfig(String),

    #[error("failed to parse config: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("failed to parse catalog JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, MatcherError>;
