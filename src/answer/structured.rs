//! Parsing model output into a structured answer, with one regeneration.

use super::{GenerativeModel, ImageInput};
use crate::error::{GroundwiseError, Result};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, warn};

const DEFAULT_RESPONSE: &str = "No response generated.";
const DEFAULT_KEYWORD: &str = "Unknown";

/// The three-field answer the prompt asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuredAnswer {
    pub response: String,
    /// Search query for a related video; `None` when absent or empty.
    pub video_suggestion: Option<String>,
    pub keyword: String,
}

impl StructuredAnswer {
    /// Parse a JSON object with `Response`, `Video_Suggestion` and `Keyword` keys.
    ///
    /// Missing fields take defaults; anything other than a JSON object is an error.
    pub fn parse(raw: &str) -> std::result::Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_str(raw.trim())?;
        let object: Map<String, Value> = serde_json::from_value(value)?;

        Ok(Self {
            response: field(&object, "Response").unwrap_or_else(|| DEFAULT_RESPONSE.to_string()),
            video_suggestion: field(&object, "Video_Suggestion").filter(|s| !s.trim().is_empty()),
            keyword: field(&object, "Keyword").unwrap_or_else(|| DEFAULT_KEYWORD.to_string()),
        })
    }
}

fn field(object: &Map<String, Value>, key: &str) -> Option<String> {
    match object.get(key)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

enum Attempt {
    Primary(String),
    Regenerate(serde_json::Error),
    Regenerated(String),
}

/// Turns raw answer text into a [`StructuredAnswer`], asking the model once more on failure.
pub struct StructuredAnswerResolver {
    model: Arc<dyn GenerativeModel>,
}

impl StructuredAnswerResolver {
    pub fn new(model: Arc<dyn GenerativeModel>) -> Self {
        Self { model }
    }

    pub async fn resolve(
        &self,
        raw: String,
        prompt: &str,
        image: Option<&ImageInput>,
    ) -> Result<StructuredAnswer> {
        let mut attempt = Attempt::Primary(raw);

        loop {
            attempt = match attempt {
                Attempt::Primary(raw) => match StructuredAnswer::parse(&raw) {
                    Ok(answer) => return Ok(answer),
                    Err(e) => Attempt::Regenerate(e),
                },
                Attempt::Regenerate(cause) => {
                    warn!("Answer was not valid JSON ({}), regenerating", cause);
                    Attempt::Regenerated(self.model.generate(prompt, image).await?)
                }
                Attempt::Regenerated(raw) => {
                    return StructuredAnswer::parse(&raw)
                        .inspect(|_| debug!("Regenerated answer parsed"))
                        .map_err(|source| GroundwiseError::StructuredOutput {
                            attempts: 2,
                            source,
                        });
                }
            };
        }
    }
}
