//! Writing documents and chunks into a hosted semantic-retrieval corpus.

mod retriever;

pub use retriever::RetrieverClient;

use crate::chunking::chunk_passages;
use crate::error::{GroundwiseError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::Retry;
use tracing::{debug, info, instrument, warn};

/// The service accepts at most this many chunk requests per batch call.
pub const MAX_CHUNKS_PER_BATCH: usize = 100;

/// A named container of documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Corpus {
    /// Resource name, e.g. `corpora/my-corpus-123`.
    pub name: String,
    pub display_name: String,
}

/// A document inside a corpus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Resource name, e.g. `corpora/c/documents/d`.
    pub name: String,
    pub display_name: String,
    pub metadata: BTreeMap<String, String>,
}

/// A stored, retrievable chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub name: String,
    pub text: String,
}

/// A chunk returned by semantic retrieval with its relevance score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelevantChunk {
    pub chunk: Chunk,
    pub relevance: f64,
}

/// Corpus, document and chunk management operations.
#[async_trait]
pub trait CorpusService: Send + Sync {
    /// List every corpus visible to the credential.
    async fn list_corpora(&self) -> Result<Vec<Corpus>>;

    async fn create_corpus(&self, display_name: &str) -> Result<Corpus>;

    async fn create_document(
        &self,
        corpus: &str,
        display_name: &str,
        metadata: &BTreeMap<String, String>,
    ) -> Result<Document>;

    /// Delete a document together with its chunks.
    async fn delete_document(&self, document: &str) -> Result<()>;

    /// Create chunks in one atomic call (at most [`MAX_CHUNKS_PER_BATCH`]).
    async fn batch_create_chunks(&self, document: &str, texts: &[String]) -> Result<Vec<Chunk>>;

    /// Semantic retrieval of the `results_count` most relevant chunks, best first.
    async fn query_corpus(
        &self,
        corpus: &str,
        query: &str,
        results_count: usize,
    ) -> Result<Vec<RelevantChunk>>;
}

/// Writes documents into a corpus using a [`CorpusService`].
pub struct CorpusWriter {
    service: Arc<dyn CorpusService>,
    max_chars_per_chunk: usize,
    lookup_attempts: usize,
}

impl CorpusWriter {
    pub fn new(service: Arc<dyn CorpusService>) -> Self {
        Self {
            service,
            max_chars_per_chunk: crate::chunking::DEFAULT_MAX_CHARS,
            lookup_attempts: 3,
        }
    }

    /// Set the character budget used to split passages.
    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars_per_chunk = max_chars;
        self
    }

    /// Set how many times corpus lookup/creation is attempted.
    pub fn with_lookup_attempts(mut self, attempts: usize) -> Self {
        self.lookup_attempts = attempts.max(1);
        self
    }

    /// Find a corpus by display name without creating one.
    pub async fn find_corpus(&self, display_name: &str) -> Result<Option<Corpus>> {
        let corpora = self.service.list_corpora().await?;
        Ok(corpora.into_iter().find(|c| c.display_name == display_name))
    }

    /// Return the corpus with this display name, creating it if none exists.
    ///
    /// Concurrent callers can still create duplicates; the service does not
    /// enforce unique display names.
    #[instrument(skip(self))]
    pub async fn get_or_create_corpus(&self, display_name: &str) -> Result<Corpus> {
        let strategy = ExponentialBackoff::from_millis(2)
            .factor(100)
            .max_delay(Duration::from_secs(5))
            .map(jitter)
            .take(self.lookup_attempts - 1);

        Retry::spawn(strategy, || async {
            self.lookup_or_create(display_name).await.inspect_err(|e| {
                warn!("Corpus lookup for '{}' failed: {}", display_name, e);
            })
        })
        .await
    }

    async fn lookup_or_create(&self, display_name: &str) -> Result<Corpus> {
        if let Some(corpus) = self.find_corpus(display_name).await? {
            debug!("Found corpus {}", corpus.name);
            return Ok(corpus);
        }

        let corpus = self.service.create_corpus(display_name).await?;
        info!("Created corpus {} ({})", corpus.name, display_name);
        Ok(corpus)
    }

    pub async fn create_document(
        &self,
        corpus: &Corpus,
        display_name: &str,
        metadata: BTreeMap<String, String>,
    ) -> Result<Document> {
        if display_name.trim().is_empty() {
            return Err(GroundwiseError::InvalidInput(
                "document display name is empty".to_string(),
            ));
        }
        self.service
            .create_document(&corpus.name, display_name, &metadata)
            .await
    }

    /// Split passages into chunks and submit them in batches.
    ///
    /// Each batch call is all-or-nothing. When a batch fails the document is
    /// deleted, so earlier batches never stay behind, and the batch error is returned.
    #[instrument(skip(self, document, passages), fields(document = %document.name))]
    pub async fn create_chunks<P: AsRef<str> + Sync>(
        &self,
        document: &Document,
        passages: &[P],
    ) -> Result<Vec<Chunk>> {
        let texts = chunk_passages(passages, self.max_chars_per_chunk);
        debug!(
            "Submitting {} chunks from {} passages",
            texts.len(),
            passages.len()
        );

        let mut created = Vec::with_capacity(texts.len());
        for batch in texts.chunks(MAX_CHUNKS_PER_BATCH) {
            match self.service.batch_create_chunks(&document.name, batch).await {
                Ok(chunks) => created.extend(chunks),
                Err(e) => {
                    self.discard_document(document, created.len()).await;
                    return Err(e);
                }
            }
        }

        Ok(created)
    }

    async fn discard_document(&self, document: &Document, committed: usize) {
        warn!(
            "Chunk batch failed after {} committed chunks; deleting {}",
            committed, document.name
        );
        if let Err(e) = self.service.delete_document(&document.name).await {
            warn!("Could not delete {}: {}", document.name, e);
        }
    }
}
