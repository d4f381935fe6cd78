//! Error types for Groundwise.

use thiserror::Error;

/// Library-level error type for Groundwise operations.
#[derive(Error, Debug)]
pub enum GroundwiseError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Credential error: {0}")]
    Credentials(String),

    #[error("Text extraction failed for {path}: {message}")]
    Extraction { path: String, message: String },

    #[error("Corpus error: {0}")]
    Corpus(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Query response structure is unexpected.")]
    MalformedAnswer,

    #[error("Structured output could not be parsed after {attempts} attempts: {source}")]
    StructuredOutput {
        attempts: u8,
        #[source]
        source: serde_json::Error,
    },

    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("Video search failed: {0}")]
    VideoSearch(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl GroundwiseError {
    pub fn extraction(path: impl AsRef<std::path::Path>, message: impl std::fmt::Display) -> Self {
        Self::Extraction {
            path: path.as_ref().display().to_string(),
            message: message.to_string(),
        }
    }
}

/// Result type alias for Groundwise operations.
pub type Result<T> = std::result::Result<T, GroundwiseError>;
