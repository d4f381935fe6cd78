use super::{QueryResult, StructuredAnswer};
use crate::video::VideoSearch;
use std::sync::Arc;
use tracing::{debug, warn};

/// Builds the final [`QueryResult`], attaching a video when one can be found.
pub struct ResultAssembler {
    video: Option<Arc<dyn VideoSearch>>,
    max_results: u32,
}

impl ResultAssembler {
    pub fn new(video: Option<Arc<dyn VideoSearch>>, max_results: u32) -> Self {
        Self {
            video,
            max_results: max_results.max(1),
        }
    }

    /// An assembler that never looks up videos.
    pub fn without_video() -> Self {
        Self::new(None, 1)
    }

    pub async fn assemble(&self, answer: StructuredAnswer) -> QueryResult {
        let mut result = QueryResult::answer(answer.response, answer.keyword);

        if let (Some(video), Some(suggestion)) = (&self.video, answer.video_suggestion.as_deref()) {
            match video.search(suggestion, self.max_results).await {
                Ok(ids) => {
                    result.video_suggestion = ids.into_iter().next();
                    if result.video_suggestion.is_none() {
                        debug!("No videos found for '{}'", suggestion);
                    }
                }
                Err(e) => warn!("Video search for '{}' failed: {}", suggestion, e),
            }
        }

        result
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::{GroundwiseError, Result};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Video search returning fixed ids, or failing when `ids` is `None`.
    pub(crate) struct FakeVideoSearch {
        pub ids: Option<Vec<String>>,
        pub queries: Mutex<Vec<String>>,
    }

    impl FakeVideoSearch {
        pub fn returning(ids: &[&str]) -> Self {
            Self {
                ids: Some(ids.iter().map(|s| s.to_string()).collect()),
                queries: Mutex::new(Vec::new()),
            }
        }

        pub fn failing() -> Self {
            Self {
                ids: None,
                queries: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl VideoSearch for FakeVideoSearch {
        async fn search(&self, query: &str, _max_results: u32) -> Result<Vec<String>> {
            self.queries.lock().unwrap().push(query.to_string());
            self.ids
                .clone()
                .ok_or_else(|| GroundwiseError::VideoSearch("quota exceeded".to_string()))
        }
    }

    fn answer(suggestion: Option<&str>) -> StructuredAnswer {
        StructuredAnswer {
            response: "X".to_string(),
            video_suggestion: suggestion.map(str::to_string),
            keyword: "Z".to_string(),
        }
    }

    #[tokio::test]
    async fn test_first_video_is_attached() {
        let video = Arc::new(FakeVideoSearch::returning(&["vid1", "vid2"]));
        let result = ResultAssembler::new(Some(video.clone()), 1)
            .assemble(answer(Some("Y")))
            .await;

        assert_eq!(result.result.as_deref(), Some("X"));
        assert_eq!(result.keyword.as_deref(), Some("Z"));
        assert_eq!(result.video_suggestion.as_deref(), Some("vid1"));
        assert_eq!(*video.queries.lock().unwrap(), vec!["Y"]);
    }

    #[tokio::test]
    async fn test_zero_results_leave_no_video() {
        let video = Arc::new(FakeVideoSearch::returning(&[]));
        let result = ResultAssembler::new(Some(video), 1)
            .assemble(answer(Some("Y")))
            .await;

        assert!(result.video_suggestion.is_none());
        assert!(!result.is_error());
        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("video_suggestion").is_none());
    }

    #[tokio::test]
    async fn test_search_failure_is_not_fatal() {
        let video = Arc::new(FakeVideoSearch::failing());
        let result = ResultAssembler::new(Some(video), 1)
            .assemble(answer(Some("Y")))
            .await;
        assert!(result.video_suggestion.is_none());
        assert!(!result.is_error());
    }

    #[tokio::test]
    async fn test_no_suggestion_skips_search() {
        let video = Arc::new(FakeVideoSearch::returning(&["vid1"]));
        let result = ResultAssembler::new(Some(video.clone()), 1)
            .assemble(answer(None))
            .await;
        assert!(result.video_suggestion.is_none());
        assert!(video.queries.lock().unwrap().is_empty());
    }
}
