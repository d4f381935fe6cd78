//! REST implementation of [`CorpusService`] for the Generative Language retriever API.

use super::{Chunk, Corpus, CorpusService, Document, RelevantChunk};
use crate::api::ApiClient;
use crate::error::{GroundwiseError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, instrument};

const LIST_PAGE_SIZE: &str = "20";

/// Corpus management over `corpora`, `documents` and `chunks:batchCreate`.
pub struct RetrieverClient {
    api: ApiClient,
}

impl RetrieverClient {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CorpusResource {
    name: String,
    #[serde(default)]
    display_name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListCorporaResponse {
    #[serde(default)]
    corpora: Vec<CorpusResource>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CustomMetadata {
    key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    string_value: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NewDocument<'a> {
    display_name: &'a str,
    custom_metadata: Vec<CustomMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DocumentResource {
    name: String,
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    custom_metadata: Vec<CustomMetadata>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChunkData {
    #[serde(default)]
    string_value: String,
}

#[derive(Debug, Serialize)]
struct NewChunk<'a> {
    data: ChunkDataRef<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ChunkDataRef<'a> {
    string_value: &'a str,
}

#[derive(Debug, Serialize)]
struct CreateChunkRequest<'a> {
    parent: &'a str,
    chunk: NewChunk<'a>,
}

#[derive(Debug, Serialize)]
struct BatchCreateChunksRequest<'a> {
    requests: Vec<CreateChunkRequest<'a>>,
}

#[derive(Debug, Deserialize)]
struct ChunkResource {
    name: String,
    data: ChunkData,
}

#[derive(Debug, Default, Deserialize)]
struct BatchCreateChunksResponse {
    #[serde(default)]
    chunks: Vec<ChunkResource>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryCorpusRequest<'a> {
    query: &'a str,
    results_count: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RelevantChunkResource {
    #[serde(default)]
    chunk_relevance_score: f64,
    chunk: ChunkResource,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryCorpusResponse {
    #[serde(default)]
    relevant_chunks: Vec<RelevantChunkResource>,
}

impl From<ChunkResource> for Chunk {
    fn from(resource: ChunkResource) -> Self {
        Self {
            name: resource.name,
            text: resource.data.string_value,
        }
    }
}

impl From<CorpusResource> for Corpus {
    fn from(resource: CorpusResource) -> Self {
        Self {
            name: resource.name,
            display_name: resource.display_name,
        }
    }
}

impl From<DocumentResource> for Document {
    fn from(resource: DocumentResource) -> Self {
        Self {
            name: resource.name,
            display_name: resource.display_name,
            metadata: resource
                .custom_metadata
                .into_iter()
                .filter_map(|m| m.string_value.map(|v| (m.key, v)))
                .collect(),
        }
    }
}

fn batch_request<'a>(document: &'a str, texts: &'a [String]) -> BatchCreateChunksRequest<'a> {
    BatchCreateChunksRequest {
        requests: texts
            .iter()
            .map(|text| CreateChunkRequest {
                parent: document,
                chunk: NewChunk {
                    data: ChunkDataRef {
                        string_value: text,
                    },
                },
            })
            .collect(),
    }
}

#[async_trait]
impl CorpusService for RetrieverClient {
    #[instrument(skip(self))]
    async fn list_corpora(&self) -> Result<Vec<Corpus>> {
        let mut corpora = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = vec![("pageSize", LIST_PAGE_SIZE.to_string())];
            if let Some(token) = page_token.take() {
                query.push(("pageToken", token));
            }

            let page: ListCorporaResponse = self.api.get("corpora", &query).await?;
            corpora.extend(page.corpora.into_iter().map(Corpus::from));

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!("Listed {} corpora", corpora.len());
        Ok(corpora)
    }

    #[instrument(skip(self))]
    async fn create_corpus(&self, display_name: &str) -> Result<Corpus> {
        let body = serde_json::json!({ "displayName": display_name });
        let resource: CorpusResource = self.api.post("corpora", &body).await?;
        Ok(resource.into())
    }

    #[instrument(skip(self, metadata))]
    async fn create_document(
        &self,
        corpus: &str,
        display_name: &str,
        metadata: &BTreeMap<String, String>,
    ) -> Result<Document> {
        let body = NewDocument {
            display_name,
            custom_metadata: metadata
                .iter()
                .map(|(key, value)| CustomMetadata {
                    key: key.clone(),
                    string_value: Some(value.clone()),
                })
                .collect(),
        };
        let resource: DocumentResource = self
            .api
            .post(&format!("{}/documents", corpus), &body)
            .await?;
        Ok(resource.into())
    }

    #[instrument(skip(self, texts), fields(count = texts.len()))]
    async fn batch_create_chunks(&self, document: &str, texts: &[String]) -> Result<Vec<Chunk>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let response: BatchCreateChunksResponse = self
            .api
            .post(
                &format!("{}/chunks:batchCreate", document),
                &batch_request(document, texts),
            )
            .await?;

        if response.chunks.len() != texts.len() {
            return Err(GroundwiseError::Corpus(format!(
                "requested {} chunks but {} were created",
                texts.len(),
                response.chunks.len()
            )));
        }

        Ok(response.chunks.into_iter().map(Chunk::from).collect())
    }

    #[instrument(skip(self))]
    async fn delete_document(&self, document: &str) -> Result<()> {
        self.api
            .delete(document, &[("force", "true".to_string())])
            .await
    }

    #[instrument(skip(self))]
    async fn query_corpus(
        &self,
        corpus: &str,
        query: &str,
        results_count: usize,
    ) -> Result<Vec<RelevantChunk>> {
        let body = QueryCorpusRequest {
            query,
            results_count,
        };
        let response: QueryCorpusResponse =
            self.api.post(&format!("{}:query", corpus), &body).await?;

        debug!("Retrieved {} relevant chunks", response.relevant_chunks.len());
        Ok(response
            .relevant_chunks
            .into_iter()
            .map(|r| RelevantChunk {
                relevance: r.chunk_relevance_score,
                chunk: r.chunk.into(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list_corpora_page() {
        let json = r#"{
            "corpora": [
                {"name": "corpora/my-corpus-94qlvnd3wanj", "displayName": "My Corpus",
                 "createTime": "2024-05-01T10:00:00Z"}
            ],
            "nextPageToken": "abc"
        }"#;
        let page: ListCorporaResponse = serde_json::from_str(json).unwrap();
        assert_eq!(page.next_page_token.as_deref(), Some("abc"));
        let corpus = Corpus::from(page.corpora.into_iter().next().unwrap());
        assert_eq!(corpus.name, "corpora/my-corpus-94qlvnd3wanj");
        assert_eq!(corpus.display_name, "My Corpus");
    }

    #[test]
    fn test_parse_empty_list() {
        let page: ListCorporaResponse = serde_json::from_str("{}").unwrap();
        assert!(page.corpora.is_empty());
        assert!(page.next_page_token.is_none());
    }

    #[test]
    fn test_document_body_carries_metadata() {
        let body = NewDocument {
            display_name: "report.pdf",
            custom_metadata: vec![CustomMetadata {
                key: "source".to_string(),
                string_value: Some("static/data/report.pdf".to_string()),
            }],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["displayName"], "report.pdf");
        assert_eq!(json["customMetadata"][0]["key"], "source");
        assert_eq!(json["customMetadata"][0]["stringValue"], "static/data/report.pdf");
    }

    #[test]
    fn test_document_resource_keeps_string_metadata() {
        let json = r#"{"name":"corpora/c/documents/d","displayName":"report.pdf",
            "customMetadata":[{"key":"source","stringValue":"a.pdf"},{"key":"pages","numericValue":3}]}"#;
        let document = Document::from(serde_json::from_str::<DocumentResource>(json).unwrap());
        assert_eq!(document.metadata.len(), 1);
        assert_eq!(document.metadata["source"], "a.pdf");
    }

    #[test]
    fn test_batch_request_shape() {
        let texts = vec!["first chunk".to_string(), "second chunk".to_string()];
        let json = serde_json::to_value(batch_request("corpora/c/documents/d", &texts)).unwrap();

        assert_eq!(json["requests"].as_array().unwrap().len(), 2);
        assert_eq!(json["requests"][0]["parent"], "corpora/c/documents/d");
        assert_eq!(json["requests"][1]["chunk"]["data"]["stringValue"], "second chunk");
    }

    #[test]
    fn test_parse_batch_response() {
        let json = r#"{"chunks":[{"name":"corpora/c/documents/d/chunks/x1",
            "data":{"stringValue":"first chunk"},"state":"STATE_PENDING_PROCESSING"}]}"#;
        let response: BatchCreateChunksResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.chunks[0].name, "corpora/c/documents/d/chunks/x1");
        assert_eq!(response.chunks[0].data.string_value, "first chunk");
    }

    #[test]
    fn test_query_request_shape() {
        let body = QueryCorpusRequest {
            query: "How are batteries recycled?",
            results_count: 5,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"query": "How are batteries recycled?", "resultsCount": 5})
        );
    }

    #[test]
    fn test_parse_query_response() {
        let json = r#"{"relevantChunks":[
            {"chunkRelevanceScore":0.82,"chunk":{"name":"corpora/c/documents/d/chunks/a",
             "data":{"stringValue":"Cells are shredded."}}},
            {"chunk":{"name":"corpora/c/documents/d/chunks/b","data":{"stringValue":"Lithium is leached."}}}
        ]}"#;
        let response: QueryCorpusResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.relevant_chunks.len(), 2);
        assert_eq!(response.relevant_chunks[0].chunk_relevance_score, 0.82);
        assert_eq!(response.relevant_chunks[1].chunk_relevance_score, 0.0);

        let chunk = Chunk::from(response.relevant_chunks.into_iter().next().unwrap().chunk);
        assert_eq!(chunk.text, "Cells are shredded.");
    }

    #[test]
    fn test_parse_empty_query_response() {
        let response: QueryCorpusResponse = serde_json::from_str("{}").unwrap();
        assert!(response.relevant_chunks.is_empty());
    }
}
