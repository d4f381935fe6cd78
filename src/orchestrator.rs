//! Pipeline orchestrator for Groundwise.
//!
//! Wires the long-lived service clients together and drives the ingestion and
//! query pipelines.

use crate::answer::{
    AqaClient, AqaConfig, ConfidenceGate, GeminiClient, GenerativeModel, GroundedAnswerService,
    QueryEngine, ResultAssembler,
};
use crate::api::{create_http_client, ApiClient};
use crate::auth;
use crate::chunking::{ChunkingConfig, PassageChunker};
use crate::config::{Prompts, Settings};
use crate::corpus::{Corpus, CorpusService, CorpusWriter, RelevantChunk, RetrieverClient};
use crate::error::{GroundwiseError, Result};
use crate::extract::{PdfExtractor, TextExtractor};
use crate::video::{VideoSearch, YoutubeClient};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Upper bound the retriever accepts for `resultsCount`.
pub const MAX_SEARCH_RESULTS: usize = 100;

/// The main orchestrator for the Groundwise pipelines.
pub struct Orchestrator {
    settings: Settings,
    prompts: Prompts,
    extractor: Arc<dyn TextExtractor>,
    corpus_service: Arc<dyn CorpusService>,
    grounded: Arc<dyn GroundedAnswerService>,
    model: Arc<dyn GenerativeModel>,
    video: Option<Arc<dyn VideoSearch>>,
}

impl Orchestrator {
    /// Create an orchestrator backed by the hosted Google services.
    pub fn new(settings: Settings) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        let http = create_http_client(settings.request_timeout())?;
        let credentials = auth::default_provider(&settings, http.clone());

        let generative = ApiClient::new(
            http.clone(),
            &settings.api.generative_base_url,
            credentials.clone(),
        )?;

        let corpus_service: Arc<dyn CorpusService> =
            Arc::new(RetrieverClient::new(generative.clone()));
        let grounded: Arc<dyn GroundedAnswerService> = Arc::new(AqaClient::new(
            generative.clone(),
            AqaConfig::from(&settings.answer),
        ));
        let model: Arc<dyn GenerativeModel> =
            Arc::new(GeminiClient::from_settings(generative, &settings.fallback));

        let video: Option<Arc<dyn VideoSearch>> = if settings.video.enabled {
            let youtube = ApiClient::new(http, &settings.api.youtube_base_url, credentials)?;
            Some(Arc::new(YoutubeClient::new(youtube)))
        } else {
            info!("Video suggestions disabled");
            None
        };

        Ok(Self {
            settings,
            prompts,
            extractor: Arc::new(PdfExtractor::new()),
            corpus_service,
            grounded,
            model,
            video,
        })
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(
        settings: Settings,
        prompts: Prompts,
        extractor: Arc<dyn TextExtractor>,
        corpus_service: Arc<dyn CorpusService>,
        grounded: Arc<dyn GroundedAnswerService>,
        model: Arc<dyn GenerativeModel>,
        video: Option<Arc<dyn VideoSearch>>,
    ) -> Self {
        Self {
            settings,
            prompts,
            extractor,
            corpus_service,
            grounded,
            model,
            video,
        }
    }

    /// Get the settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    fn corpus_writer(&self) -> CorpusWriter {
        CorpusWriter::new(self.corpus_service.clone())
            .with_max_chars(self.settings.chunking.max_chars_per_chunk)
            .with_lookup_attempts(self.settings.corpus.lookup_retries)
    }

    fn configured_corpus(&self) -> Option<Corpus> {
        self.settings.corpus.resource_name.as_ref().map(|name| Corpus {
            name: name.clone(),
            display_name: self.settings.corpus.display_name.clone(),
        })
    }

    /// The corpus to query: the configured resource, or a lookup by display name.
    ///
    /// Never creates a corpus.
    pub async fn resolve_corpus(&self) -> Result<Corpus> {
        if let Some(corpus) = self.configured_corpus() {
            return Ok(corpus);
        }

        let display_name = &self.settings.corpus.display_name;
        self.corpus_writer()
            .find_corpus(display_name)
            .await?
            .ok_or_else(|| {
                GroundwiseError::Corpus(format!(
                    "no corpus named '{}' exists; run `groundwise ingest` first",
                    display_name
                ))
            })
    }

    /// Look the configured corpus up in the service, by resource name when one
    /// is configured and by display name otherwise.
    pub async fn find_existing_corpus(&self) -> Result<Option<Corpus>> {
        match &self.settings.corpus.resource_name {
            Some(name) => {
                let corpora = self.corpus_service.list_corpora().await?;
                Ok(corpora.into_iter().find(|c| &c.name == name))
            }
            None => {
                self.corpus_writer()
                    .find_corpus(&self.settings.corpus.display_name)
                    .await
            }
        }
    }

    /// Build the query pipeline for the resolved corpus.
    pub async fn query_engine(&self) -> Result<QueryEngine> {
        let corpus = self.resolve_corpus().await?;
        info!("Answering from corpus {}", corpus.name);

        let assembler = ResultAssembler::new(self.video.clone(), self.settings.video.max_results);
        Ok(
            QueryEngine::new(corpus, self.grounded.clone(), self.model.clone(), assembler)
                .with_gate(ConfidenceGate::new(self.settings.answer.confidence_threshold))
                .with_prompts(self.prompts.clone()),
        )
    }

    /// Retrieve the passages most relevant to `query` without generating an answer.
    #[instrument(skip(self))]
    pub async fn search(&self, query: &str, results_count: usize) -> Result<Vec<RelevantChunk>> {
        if query.trim().is_empty() {
            return Err(GroundwiseError::InvalidInput("query is empty".to_string()));
        }
        if !(1..=MAX_SEARCH_RESULTS).contains(&results_count) {
            return Err(GroundwiseError::InvalidInput(format!(
                "results count must be between 1 and {}",
                MAX_SEARCH_RESULTS
            )));
        }

        let corpus = self.resolve_corpus().await?;
        self.corpus_service
            .query_corpus(&corpus.name, query, results_count)
            .await
    }

    /// Source files in `dir` the extractor can read, sorted by path.
    pub fn scan_directory(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        if !dir.is_dir() {
            return Err(GroundwiseError::InvalidInput(format!(
                "not a directory: {}",
                dir.display()
            )));
        }

        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_file() && self.extractor.can_handle(&path) {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    /// Ingest every PDF in `dir` into the configured corpus and write the chunk side-file.
    ///
    /// `on_document` is called after each document finishes, in input order.
    #[instrument(skip(self, on_document), fields(dir = %dir.display()))]
    pub async fn ingest_directory(
        &self,
        dir: &Path,
        on_document: &(dyn Fn(&DocumentOutcome) + Sync),
    ) -> Result<IngestReport> {
        let files = self.scan_directory(dir)?;
        info!("Found {} documents to ingest", files.len());

        let writer = self.corpus_writer();
        let corpus = match self.configured_corpus() {
            Some(corpus) => corpus,
            None => {
                writer
                    .get_or_create_corpus(&self.settings.corpus.display_name)
                    .await?
            }
        };

        let chunking = ChunkingConfig::from(&self.settings.chunking);
        let chunker = PassageChunker::new(chunking.max_words_per_passage);
        let concurrency = self.settings.ingest.max_concurrent_documents.max(1);

        let mut outcomes = stream::iter(files)
            .map(|path| {
                let (writer, chunker, corpus) = (&writer, &chunker, &corpus);
                async move {
                    let result = self.ingest_document(writer, chunker, corpus, &path).await;
                    (path, result)
                }
            })
            .buffered(concurrency);

        let mut report = IngestReport {
            corpus: corpus.clone(),
            documents: Vec::new(),
            skipped: Vec::new(),
            side_file: None,
        };

        while let Some((path, result)) = outcomes.next().await {
            let outcome = match result {
                Ok(document) => DocumentOutcome::Ingested(document),
                Err(e @ GroundwiseError::Extraction { .. }) if !self.settings.ingest.fail_fast => {
                    warn!("Skipping {}: {}", path.display(), e);
                    DocumentOutcome::Skipped {
                        path,
                        reason: e.to_string(),
                    }
                }
                Err(e) => return Err(e),
            };

            on_document(&outcome);
            match outcome {
                DocumentOutcome::Ingested(document) => report.documents.push(document),
                DocumentOutcome::Skipped { path, reason } => {
                    report.skipped.push(SkippedDocument { path, reason })
                }
            }
        }

        let side_file = self.settings.side_file_path();
        write_side_file(&side_file, &report.chunk_records())?;
        report.side_file = Some(side_file);

        info!(
            "Ingested {} documents ({} chunks), skipped {}",
            report.documents.len(),
            report.chunk_count(),
            report.skipped.len()
        );
        Ok(report)
    }

    /// Extract, chunk and store one document.
    async fn ingest_document(
        &self,
        writer: &CorpusWriter,
        chunker: &PassageChunker,
        corpus: &Corpus,
        path: &Path,
    ) -> Result<DocumentReport> {
        let text = self.extractor.extract(path).await?;
        let passages = chunker.chunk(&text);
        if passages.is_empty() {
            warn!("No text found in {}", path.display());
        }

        let display_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut metadata = BTreeMap::new();
        metadata.insert("source".to_string(), path.display().to_string());

        let document = writer
            .create_document(corpus, &display_name, metadata)
            .await?;
        let chunks = writer.create_chunks(&document, &passages).await?;
        info!(
            "Stored {} chunks for {} as {}",
            chunks.len(),
            display_name,
            document.name
        );

        Ok(DocumentReport {
            path: path.to_path_buf(),
            document: document.name,
            chunks: chunks
                .into_iter()
                .map(|c| ChunkRecord {
                    chunk_id: c.name,
                    text: c.text,
                })
                .collect(),
        })
    }
}

/// One entry of the chunk side-file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub chunk_id: String,
    pub text: String,
}

/// A document stored in the corpus.
#[derive(Debug, Clone)]
pub struct DocumentReport {
    pub path: PathBuf,
    /// Resource name of the created document.
    pub document: String,
    pub chunks: Vec<ChunkRecord>,
}

#[derive(Debug, Clone)]
pub struct SkippedDocument {
    pub path: PathBuf,
    pub reason: String,
}

/// Per-document progress event.
#[derive(Debug, Clone)]
pub enum DocumentOutcome {
    Ingested(DocumentReport),
    Skipped { path: PathBuf, reason: String },
}

/// Result of an ingestion run.
#[derive(Debug)]
pub struct IngestReport {
    pub corpus: Corpus,
    pub documents: Vec<DocumentReport>,
    pub skipped: Vec<SkippedDocument>,
    pub side_file: Option<PathBuf>,
}

impl IngestReport {
    pub fn chunk_count(&self) -> usize {
        self.documents.iter().map(|d| d.chunks.len()).sum()
    }

    /// Every stored chunk, in document then chunk order.
    pub fn chunk_records(&self) -> Vec<ChunkRecord> {
        self.documents
            .iter()
            .flat_map(|d| d.chunks.iter().cloned())
            .collect()
    }
}

fn write_side_file(path: &Path, records: &[ChunkRecord]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(records)?;
    std::fs::write(path, json)?;
    Ok(())
}
