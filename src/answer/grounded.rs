//! Attributed question answering against a corpus.

use crate::api::ApiClient;
use crate::config::AnswerSettings;
use crate::corpus::Corpus;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Output of the grounded answer service.
///
/// `text` is `None` when the response did not carry an answer part.
#[derive(Debug, Clone, PartialEq)]
pub struct GroundedAnswer {
    pub text: Option<String>,
    /// Service-estimated probability in `[0, 1]` that the question is answerable from the corpus.
    pub answerable_probability: f64,
}

#[async_trait]
pub trait GroundedAnswerService: Send + Sync {
    async fn generate_answer(&self, corpus: &Corpus, query: &str) -> Result<GroundedAnswer>;
}

/// Request parameters for the attributed QA model.
#[derive(Debug, Clone)]
pub struct AqaConfig {
    pub model: String,
    pub temperature: f32,
    pub answer_style: String,
}

impl Default for AqaConfig {
    fn default() -> Self {
        Self::from(&AnswerSettings::default())
    }
}

impl From<&AnswerSettings> for AqaConfig {
    fn from(settings: &AnswerSettings) -> Self {
        Self {
            model: settings.model.clone(),
            temperature: settings.temperature,
            answer_style: settings.answer_style.clone(),
        }
    }
}

/// `generateAnswer` client for the AQA model.
pub struct AqaClient {
    api: ApiClient,
    config: AqaConfig,
}

impl AqaClient {
    pub fn new(api: ApiClient, config: AqaConfig) -> Self {
        Self { api, config }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct RetrieverQuery {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct SemanticRetriever<'a> {
    source: &'a str,
    query: RetrieverQuery,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateAnswerRequest<'a> {
    contents: Vec<Content>,
    answer_style: &'a str,
    temperature: f32,
    semantic_retriever: SemanticRetriever<'a>,
}

#[derive(Debug, Default, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Default, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateAnswerResponse {
    #[serde(default)]
    answer: Option<Candidate>,
    #[serde(default)]
    answerable_probability: Option<f64>,
}

impl From<GenerateAnswerResponse> for GroundedAnswer {
    fn from(response: GenerateAnswerResponse) -> Self {
        let text = response
            .answer
            .and_then(|a| a.content)
            .and_then(|c| c.parts.into_iter().next())
            .and_then(|p| p.text);

        Self {
            text,
            answerable_probability: response.answerable_probability.unwrap_or(0.0),
        }
    }
}

fn answer_request<'a>(
    config: &'a AqaConfig,
    corpus: &'a str,
    query: &str,
) -> GenerateAnswerRequest<'a> {
    GenerateAnswerRequest {
        contents: vec![Content {
            role: "user",
            parts: vec![Part {
                text: Some(query.to_string()),
            }],
        }],
        answer_style: &config.answer_style,
        temperature: config.temperature,
        semantic_retriever: SemanticRetriever {
            source: corpus,
            query: RetrieverQuery {
                parts: vec![Part {
                    text: Some(query.to_string()),
                }],
            },
        },
    }
}

#[async_trait]
impl GroundedAnswerService for AqaClient {
    #[instrument(skip(self, corpus), fields(corpus = %corpus.name))]
    async fn generate_answer(&self, corpus: &Corpus, query: &str) -> Result<GroundedAnswer> {
        let body = answer_request(&self.config, &corpus.name, query);
        let response: GenerateAnswerResponse = self
            .api
            .post(&format!("{}:generateAnswer", self.config.model), &body)
            .await?;

        let answer = GroundedAnswer::from(response);
        debug!(
            "Answerable probability {:.3}, text present: {}",
            answer.answerable_probability,
            answer.text.is_some()
        );
        Ok(answer)
    }
}
