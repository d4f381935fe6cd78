//! General-purpose multimodal generation, used when the grounded answer is not trusted.

use super::ImageInput;
use crate::api::ApiClient;
use crate::config::FallbackSettings;
use crate::error::{GroundwiseError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Generate text for `prompt`, optionally conditioned on an image.
    async fn generate(&self, prompt: &str, image: Option<&ImageInput>) -> Result<String>;
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_output_tokens: u32,
    pub response_mime_type: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self::from(&FallbackSettings::default())
    }
}

impl From<&FallbackSettings> for GenerationConfig {
    fn from(settings: &FallbackSettings) -> Self {
        Self {
            temperature: settings.temperature,
            top_p: settings.top_p,
            top_k: settings.top_k,
            max_output_tokens: settings.max_output_tokens,
            response_mime_type: "application/json".to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData<'a> {
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RequestPart<'a> {
    Text {
        text: &'a str,
    },
    Image {
        #[serde(rename = "inlineData")]
        inline_data: InlineData<'a>,
    },
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct SafetySetting {
    category: &'static str,
    threshold: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
    generation_config: &'a GenerationConfig,
    safety_settings: Vec<SafetySetting>,
}

#[derive(Debug, Default, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponseCandidate {
    #[serde(default)]
    content: Option<ResponseContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<ResponseCandidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

fn content_request<'a>(
    config: &'a GenerationConfig,
    prompt: &'a str,
    image: Option<&'a ImageInput>,
) -> GenerateContentRequest<'a> {
    let mut parts = vec![RequestPart::Text { text: prompt }];
    if let Some(image) = image {
        parts.push(RequestPart::Image {
            inline_data: InlineData {
                mime_type: &image.mime_type,
                data: &image.data,
            },
        });
    }

    GenerateContentRequest {
        contents: vec![RequestContent {
            role: "user",
            parts,
        }],
        generation_config: config,
        safety_settings: vec![SafetySetting {
            category: "HARM_CATEGORY_HARASSMENT",
            threshold: "BLOCK_MEDIUM_AND_ABOVE",
        }],
    }
}

/// Concatenated text of the first candidate.
fn response_text(response: GenerateContentResponse) -> Result<String> {
    if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(GroundwiseError::Generation(format!("prompt blocked: {}", reason)));
    }

    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| GroundwiseError::Generation("no candidates returned".to_string()))?;

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.is_empty() {
        let reason = candidate.finish_reason.unwrap_or_else(|| "unknown".to_string());
        return Err(GroundwiseError::Generation(format!(
            "empty candidate (finish reason: {})",
            reason
        )));
    }

    Ok(text)
}

/// `generateContent` client for a Gemini model.
pub struct GeminiClient {
    api: ApiClient,
    model: String,
    config: GenerationConfig,
}

impl GeminiClient {
    pub fn new(api: ApiClient, model: impl Into<String>, config: GenerationConfig) -> Self {
        Self {
            api,
            model: model.into(),
            config,
        }
    }

    pub fn from_settings(api: ApiClient, settings: &FallbackSettings) -> Self {
        Self::new(api, settings.model.clone(), GenerationConfig::from(settings))
    }
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    #[instrument(skip(self, prompt, image), fields(model = %self.model, image = image.is_some()))]
    async fn generate(&self, prompt: &str, image: Option<&ImageInput>) -> Result<String> {
        let body = content_request(&self.config, prompt, image);
        let response: GenerateContentResponse = self
            .api
            .post(&format!("{}:generateContent", self.model), &body)
            .await?;

        let text = response_text(response).inspect_err(|e| warn!("Generation failed: {}", e))?;
        debug!("Generated {} chars", text.len());
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_with_image() {
        let config = GenerationConfig::default();
        let image = ImageInput::from_bytes("image/png", b"png");
        let json = serde_json::to_value(content_request(&config, "describe", Some(&image))).unwrap();

        let parts = &json["contents"][0]["parts"];
        assert_eq!(parts[0]["text"], "describe");
        assert_eq!(parts[1]["inlineData"]["mimeType"], "image/png");
        assert_eq!(parts[1]["inlineData"]["data"], "cG5n");

        let generation = &json["generationConfig"];
        assert_eq!(generation["topK"], 40);
        assert_eq!(generation["maxOutputTokens"], 2048);
        assert_eq!(generation["responseMimeType"], "application/json");
        assert_eq!(json["safetySettings"][0]["category"], "HARM_CATEGORY_HARASSMENT");
        assert_eq!(json["safetySettings"][0]["threshold"], "BLOCK_MEDIUM_AND_ABOVE");
    }

    #[test]
    fn test_request_without_image_has_one_part() {
        let config = GenerationConfig::default();
        let json = serde_json::to_value(content_request(&config, "hello", None)).unwrap();
        assert_eq!(json["contents"][0]["parts"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_response_text_joins_parts() {
        let json = r#"{"candidates":[{"content":{"parts":[{"text":"{\"Response\":"},{"text":"\"X\"}"}],
            "role":"model"},"finishReason":"STOP"}]}"#;
        let response: GenerateContentResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response_text(response).unwrap(), r#"{"Response":"X"}"#);
    }

    #[test]
    fn test_blocked_prompt_is_an_error() {
        let json = r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#;
        let response: GenerateContentResponse = serde_json::from_str(json).unwrap();
        let err = response_text(response).unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }

    #[test]
    fn test_empty_candidate_is_an_error() {
        let json = r#"{"candidates":[{"finishReason":"SAFETY"}]}"#;
        let response: GenerateContentResponse = serde_json::from_str(json).unwrap();
        assert!(matches!(
            response_text(response),
            Err(GroundwiseError::Generation(_))
        ));
    }
}
