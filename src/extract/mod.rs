//! Text extraction from source documents.

mod pdf;

pub use pdf::PdfExtractor;

use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// Trait for turning a source file into plain text.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Extract the full text of a document, pages concatenated in order.
    async fn extract(&self, path: &Path) -> Result<String>;

    /// Whether this extractor handles the given file.
    fn can_handle(&self, path: &Path) -> bool;
}
