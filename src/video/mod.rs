//! Video lookup for answer enrichment.

mod youtube;

pub use youtube::YoutubeClient;

use crate::error::Result;
use async_trait::async_trait;

#[async_trait]
pub trait VideoSearch: Send + Sync {
    /// Return up to `max_results` video ids for a free-text query, best match first.
    async fn search(&self, query: &str, max_results: u32) -> Result<Vec<String>>;
}
