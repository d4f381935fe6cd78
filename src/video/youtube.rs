use super::VideoSearch;
use crate::api::ApiClient;
use crate::error::{GroundwiseError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument};

/// YouTube Data API v3 `search` client.
pub struct YoutubeClient {
    api: ApiClient,
}

impl YoutubeClient {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResourceId {
    #[serde(default)]
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    #[serde(default)]
    id: ResourceId,
}

#[derive(Debug, Default, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

fn video_ids(response: SearchResponse) -> Vec<String> {
    response
        .items
        .into_iter()
        .filter_map(|item| item.id.video_id)
        .collect()
}

#[async_trait]
impl VideoSearch for YoutubeClient {
    #[instrument(skip(self))]
    async fn search(&self, query: &str, max_results: u32) -> Result<Vec<String>> {
        let params = [
            ("part", "id,snippet".to_string()),
            ("q", query.to_string()),
            ("maxResults", max_results.to_string()),
            ("type", "video".to_string()),
        ];

        let response: SearchResponse = self
            .api
            .get("search", &params)
            .await
            .map_err(|e| GroundwiseError::VideoSearch(e.to_string()))?;

        let ids = video_ids(response);
        debug!("Found {} videos", ids.len());
        Ok(ids)
    }
}
