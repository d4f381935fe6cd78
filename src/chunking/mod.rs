//! Chunking of extracted document text into retrievable units.
//!
//! Text is first grouped into word-bounded passages, then each passage is cut
//! into character-bounded chunks, which are what the corpus stores.

mod passage;
mod splitter;

pub use passage::{PassageChunker, EXCLUDED_TAGS};
pub use splitter::split_into_chunks;

use crate::config::ChunkingSettings;
use serde::{Deserialize, Serialize};

/// Default word bound for a passage.
pub const DEFAULT_MAX_WORDS: usize = 200;

/// Default character budget for a chunk.
pub const DEFAULT_MAX_CHARS: usize = 1000;

/// An intermediate span of document text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Passage {
    /// Words joined by single spaces.
    pub text: String,
    /// Number of words in `text`.
    pub word_count: usize,
}

impl Passage {
    pub fn new(text: String, word_count: usize) -> Self {
        Self { text, word_count }
    }
}

impl AsRef<str> for Passage {
    fn as_ref(&self) -> &str {
        &self.text
    }
}

/// Size bounds for the two chunking stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    pub max_words_per_passage: usize,
    pub max_chars_per_chunk: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_words_per_passage: DEFAULT_MAX_WORDS,
            max_chars_per_chunk: DEFAULT_MAX_CHARS,
        }
    }
}

impl From<&ChunkingSettings> for ChunkingConfig {
    fn from(settings: &ChunkingSettings) -> Self {
        Self {
            max_words_per_passage: settings.max_words_per_passage,
            max_chars_per_chunk: settings.max_chars_per_chunk,
        }
    }
}

/// Flatten passages into chunk texts, preserving order.
pub fn chunk_passages<P: AsRef<str>>(passages: &[P], max_chars: usize) -> Vec<String> {
    passages
        .iter()
        .flat_map(|p| split_into_chunks(p.as_ref(), max_chars))
        .collect()
}
