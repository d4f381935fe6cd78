//! Groundwise - grounded question answering over your PDFs
//!
//! Indexes PDF documents into a hosted semantic-retrieval corpus and answers
//! questions from it.
//!
//! # Overview
//!
//! Groundwise allows you to:
//! - Extract the text of a directory of PDFs and split it into passages and chunks
//! - Store those chunks in a Generative Language API corpus
//! - Ask questions that are answered from the corpus, with a Gemini fallback
//!   when the grounded answer is not confident enough
//! - Enrich answers with a related YouTube video
//!
//! # Architecture
//!
//! - `config` - Configuration and prompt templates
//! - `auth` - Credential resolution (ambient, then service-account key)
//! - `api` - Authorized HTTP client for the Google APIs
//! - `extract` - PDF text extraction
//! - `chunking` - Passage aggregation and character-bounded chunking
//! - `corpus` - Corpus, document and chunk management
//! - `answer` - Grounded answering, confidence gate, fallback and result assembly
//! - `video` - Video search
//! - `orchestrator` - Pipeline coordination
//!
//! # Example
//!
//! ```rust,no_run
//! use groundwise::config::Settings;
//! use groundwise::orchestrator::Orchestrator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(settings)?;
//!
//!     let engine = orchestrator.query_engine().await?;
//!     let result = engine.answer("How are the panels recycled?", None).await;
//!     println!("{}", serde_json::to_string_pretty(&result)?);
//!
//!     Ok(())
//! }
//! ```

pub mod answer;
pub mod api;
pub mod auth;
pub mod chunking;
pub mod cli;
pub mod config;
pub mod corpus;
pub mod error;
pub mod extract;
pub mod orchestrator;
pub mod video;

pub use error::{GroundwiseError, Result};
