//! The per-request query pipeline.

use super::{
    ConfidenceGate, GateDecision, GenerativeModel, GroundedAnswerService, ImageInput, QueryResult,
    ResultAssembler, StructuredAnswerResolver,
};
use crate::config::Prompts;
use crate::corpus::Corpus;
use crate::error::{GroundwiseError, Result};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Answers questions against one corpus.
///
/// All collaborators are long-lived and shared; the engine holds no per-request state.
pub struct QueryEngine {
    corpus: Corpus,
    grounded: Arc<dyn GroundedAnswerService>,
    model: Arc<dyn GenerativeModel>,
    gate: ConfidenceGate,
    resolver: StructuredAnswerResolver,
    assembler: ResultAssembler,
    prompts: Prompts,
}

impl QueryEngine {
    pub fn new(
        corpus: Corpus,
        grounded: Arc<dyn GroundedAnswerService>,
        model: Arc<dyn GenerativeModel>,
        assembler: ResultAssembler,
    ) -> Self {
        Self {
            corpus,
            grounded,
            resolver: StructuredAnswerResolver::new(model.clone()),
            model,
            gate: ConfidenceGate::default(),
            assembler,
            prompts: Prompts::default(),
        }
    }

    pub fn with_gate(mut self, gate: ConfidenceGate) -> Self {
        self.gate = gate;
        self
    }

    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    /// Answer a question. Failures are reported in the returned record, never raised.
    #[instrument(skip(self, image), fields(image = image.is_some()))]
    pub async fn answer(&self, question: &str, image: Option<&ImageInput>) -> QueryResult {
        match self.try_answer(question, image).await {
            Ok(result) => result,
            Err(e) => {
                warn!("Query failed: {}", e);
                QueryResult::error(e.to_string())
            }
        }
    }

    async fn try_answer(&self, question: &str, image: Option<&ImageInput>) -> Result<QueryResult> {
        check_question(question)?;

        let prompt = self.prompts.answer_prompt(question);
        let raw = self.primary_answer(&prompt, image).await?;
        let structured = self.resolver.resolve(raw, &prompt, image).await?;
        Ok(self.assembler.assemble(structured).await)
    }

    /// Raw answer text: the grounded answer when confident, otherwise the model's.
    pub async fn primary_answer(&self, prompt: &str, image: Option<&ImageInput>) -> Result<String> {
        let grounded = self.grounded.generate_answer(&self.corpus, prompt).await?;

        match self.gate.decide(&grounded) {
            GateDecision::Accept(text) => {
                debug!("Using grounded answer");
                Ok(text)
            }
            GateDecision::Fallback => {
                info!(
                    "Answerable probability {:.3} at or below {}, using fallback model",
                    grounded.answerable_probability,
                    self.gate.threshold()
                );
                self.model.generate(prompt, image).await
            }
            GateDecision::Malformed => {
                warn!(
                    "Grounded answer with probability {:.3} has no text",
                    grounded.answerable_probability
                );
                Err(GroundwiseError::MalformedAnswer)
            }
        }
    }
}

/// Reject questions with no content before any service is called.
pub fn check_question(question: &str) -> Result<()> {
    if question.trim().is_empty() {
        return Err(GroundwiseError::InvalidInput("question is empty".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::answer::testing::{FakeVideoSearch, FixedGrounded, ScriptedModel};

    fn corpus() -> Corpus {
        Corpus {
            name: "corpora/c".to_string(),
            display_name: "My Corpus".to_string(),
        }
    }

    fn engine(
        grounded: Arc<FixedGrounded>,
        model: Arc<ScriptedModel>,
        video: Arc<FakeVideoSearch>,
    ) -> QueryEngine {
        QueryEngine::new(corpus(), grounded, model, ResultAssembler::new(Some(video), 1))
    }

    const GROUNDED_JSON: &str = r#"{"Response":"from corpus","Keyword":"corpus"}"#;
    const MODEL_JSON: &str = r#"{"Response":"X","Video_Suggestion":"Y","Keyword":"Z"}"#;

    #[tokio::test]
    async fn test_confident_grounded_answer_is_used_verbatim() {
        let grounded = Arc::new(FixedGrounded::new(Some(GROUNDED_JSON), 0.95));
        let model = Arc::new(ScriptedModel::new(&[MODEL_JSON]));
        let engine = engine(grounded, model.clone(), Arc::new(FakeVideoSearch::returning(&[])));

        let raw = engine.primary_answer("prompt", None).await.unwrap();
        assert_eq!(raw, GROUNDED_JSON);

        let result = engine.answer("question", None).await;
        assert_eq!(result.result.as_deref(), Some("from corpus"));
        assert_eq!(result.keyword.as_deref(), Some("corpus"));
        assert_eq!(model.call_count(), 0);
    }

    #[tokio::test]
    async fn test_low_confidence_uses_fallback_and_assembles_video() {
        let grounded = Arc::new(FixedGrounded::new(Some(GROUNDED_JSON), 0.5));
        let model = Arc::new(ScriptedModel::new(&[MODEL_JSON]));
        let video = Arc::new(FakeVideoSearch::returning(&["abc123", "def456"]));
        let engine = engine(grounded.clone(), model.clone(), video.clone());
        let image = ImageInput::from_bytes("image/jpeg", b"jpg");

        let result = engine.answer("What is this?", Some(&image)).await;

        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            serde_json::json!({"result": "X", "keyword": "Z", "video_suggestion": "abc123"})
        );
        assert_eq!(*video.queries.lock().unwrap(), vec!["Y"]);

        let calls = model.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].0.contains("What is this?"));
        assert!(calls[0].1);
        let queries = grounded.queries.lock().unwrap();
        assert_eq!(queries[0].0, "corpora/c");
        assert_eq!(queries[0].1, calls[0].0);
    }

    #[tokio::test]
    async fn test_unparseable_grounded_answer_regenerates_with_model() {
        let grounded = Arc::new(FixedGrounded::new(Some("Plain extractive text."), 0.97));
        let model = Arc::new(ScriptedModel::new(&[MODEL_JSON]));
        let engine = engine(grounded, model.clone(), Arc::new(FakeVideoSearch::returning(&[])));

        let result = engine.answer("question", None).await;
        assert_eq!(result.result.as_deref(), Some("X"));
        assert!(result.video_suggestion.is_none());
        assert_eq!(model.call_count(), 1);
    }

    #[tokio::test]
    async fn test_double_parse_failure_becomes_error_record() {
        let grounded = Arc::new(FixedGrounded::new(Some("text"), 0.2));
        let model = Arc::new(ScriptedModel::new(&["not json", "still not json"]));
        let engine = engine(grounded, model.clone(), Arc::new(FakeVideoSearch::returning(&[])));

        let result = engine.answer("question", None).await;
        assert!(result.is_error());
        assert!(result.result.is_none());
        assert!(result.error.unwrap().contains("2 attempts"));
        assert_eq!(model.call_count(), 2);
    }

    #[tokio::test]
    async fn test_confident_answer_without_text_is_malformed() {
        let grounded = Arc::new(FixedGrounded::new(None, 0.99));
        let model = Arc::new(ScriptedModel::new(&[MODEL_JSON]));
        let engine = engine(grounded, model.clone(), Arc::new(FakeVideoSearch::returning(&[])));

        let result = engine.answer("question", None).await;
        assert_eq!(
            result.error.as_deref(),
            Some("Query response structure is unexpected.")
        );
        assert_eq!(model.call_count(), 0);
    }

    #[tokio::test]
    async fn test_service_error_becomes_error_record() {
        let engine = engine(
            Arc::new(FixedGrounded::failing()),
            Arc::new(ScriptedModel::new(&[])),
            Arc::new(FakeVideoSearch::returning(&[])),
        );
        let result = engine.answer("question", None).await;
        assert!(result.error.unwrap().contains("RESOURCE_EXHAUSTED"));
    }

    #[tokio::test]
    async fn test_custom_threshold_changes_routing() {
        let grounded = Arc::new(FixedGrounded::new(Some(GROUNDED_JSON), 0.6));
        let model = Arc::new(ScriptedModel::new(&[]));
        let engine = engine(grounded, model.clone(), Arc::new(FakeVideoSearch::returning(&[])))
            .with_gate(ConfidenceGate::new(0.5));

        let result = engine.answer("question", None).await;
        assert_eq!(result.result.as_deref(), Some("from corpus"));
        assert_eq!(model.call_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_question_is_rejected() {
        let grounded = Arc::new(FixedGrounded::new(Some(GROUNDED_JSON), 0.95));
        let engine = engine(
            grounded.clone(),
            Arc::new(ScriptedModel::new(&[])),
            Arc::new(FakeVideoSearch::returning(&[])),
        );
        assert!(engine.answer("   ", None).await.is_error());
        assert!(grounded.queries.lock().unwrap().is_empty());
    }
}
