//! Question answering over a corpus, with a generative fallback.
//!
//! A query first goes to the grounded answer service. Confident answers are
//! kept; otherwise the general model answers instead. Either text must parse as
//! a structured answer, with one regeneration allowed, before it is enriched
//! with a video and returned as a [`QueryResult`].

mod assembler;
mod engine;
mod fallback;
mod gate;
mod grounded;
mod structured;

pub use assembler::ResultAssembler;
pub use engine::{check_question, QueryEngine};
pub use fallback::{GeminiClient, GenerationConfig, GenerativeModel};
pub use gate::{ConfidenceGate, GateDecision, CONFIDENCE_THRESHOLD};
pub use grounded::{AqaClient, AqaConfig, GroundedAnswer, GroundedAnswerService};
pub use structured::{StructuredAnswer, StructuredAnswerResolver};


use crate::error::{GroundwiseError, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// An image sent alongside the question, base64-encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageInput {
    pub mime_type: String,
    /// Base64 (standard alphabet) image bytes.
    pub data: String,
}

impl ImageInput {
    pub fn from_bytes(mime_type: &str, bytes: &[u8]) -> Self {
        Self {
            mime_type: mime_type.to_string(),
            data: STANDARD.encode(bytes),
        }
    }

    /// Read an image file, inferring the MIME type from its extension.
    pub fn from_file(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        let mime_type = match extension.as_str() {
            "png" => "image/png",
            "jpg" | "jpeg" => "image/jpeg",
            "webp" => "image/webp",
            "heic" => "image/heic",
            "heif" => "image/heif",
            "gif" => "image/gif",
            _ => {
                return Err(GroundwiseError::InvalidInput(format!(
                    "unsupported image type: {}",
                    path.display()
                )))
            }
        };

        let bytes = std::fs::read(path)?;
        Ok(Self::from_bytes(mime_type, &bytes))
    }
}

/// The record returned for every query, successful or not.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
    /// Id of the suggested video, when one was found.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_suggestion: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl QueryResult {
    pub fn answer(result: String, keyword: String) -> Self {
        Self {
            result: Some(result),
            keyword: Some(keyword),
            ..Default::default()
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}
