//! PDF text-layer extraction.

use super::TextExtractor;
use crate::error::{GroundwiseError, Result};
use async_trait::async_trait;
use std::path::Path;
use tracing::{debug, instrument};

/// Reads the text layer of a PDF with `pdf-extract`.
pub struct PdfExtractor;

impl PdfExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Drop page-break markers so pages read as one continuous text.
    fn join_pages(raw: &str) -> String {
        raw.replace('\u{c}', "")
    }
}

impl Default for PdfExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TextExtractor for PdfExtractor {
    #[instrument(skip(self), fields(path = %path.display()))]
    async fn extract(&self, path: &Path) -> Result<String> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| GroundwiseError::extraction(path, e))?;

        let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
            .await
            .map_err(|e| GroundwiseError::extraction(path, e))?
            .map_err(|e| GroundwiseError::extraction(path, e))?;

        let text = Self::join_pages(&text);
        debug!("Extracted {} characters", text.len());
        Ok(text)
    }

    fn can_handle(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
    }
}
