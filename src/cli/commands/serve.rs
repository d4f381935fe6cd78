//! HTTP API server for integration with other systems.
//!
//! Provides a REST endpoint for grounded question answering.

use crate::answer::{check_question, ImageInput, QueryEngine, QueryResult};
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

/// Shared application state.
struct AppState {
    engine: QueryEngine,
}

/// Run the HTTP API server.
pub async fn run_serve(host: &str, port: u16, settings: Settings) -> anyhow::Result<()> {
    if let Err(e) = preflight::check(Operation::Serve, &settings, None) {
        Output::error(&format!("{}", e));
        Output::info("Run 'groundwise doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let orchestrator = Orchestrator::new(settings)?;
    let engine = orchestrator.query_engine().await?;
    let corpus = engine.corpus().name.clone();

    let app = router(Arc::new(AppState { engine }));

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Serving corpus {} on {}", corpus, addr);

    Output::header("Groundwise API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    Output::kv("Corpus", &corpus);
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /health");
    Output::kv("Query", "POST /query");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/query", post(query))
        .layer(cors)
        .with_state(state)
}

// === Request/Response Types ===

#[derive(Deserialize)]
struct QueryRequest {
    query: String,
    #[serde(default)]
    image: Option<ImageInput>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    corpus: String,
}

// === Handlers ===

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        corpus: state.engine.corpus().name.clone(),
    })
}

async fn query(
    State(state): State<Arc<AppState>>,
    Json(req): Json<QueryRequest>,
) -> impl IntoResponse {
    if let Err(e) = check_question(&req.query) {
        return (StatusCode::BAD_REQUEST, Json(QueryResult::error(e.to_string())));
    }

    let result = state.engine.answer(&req.query, req.image.as_ref()).await;
    (status_for(&result), Json(result))
}

/// Error records are upstream failures from the caller's point of view.
fn status_for(result: &QueryResult) -> StatusCode {
    if result.is_error() {
        StatusCode::BAD_GATEWAY
    } else {
        StatusCode::OK
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::answer::testing::{FakeVideoSearch, FixedGrounded, ScriptedModel};
    use crate::answer::ResultAssembler;
    use crate::corpus::Corpus;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    fn app(grounded: FixedGrounded) -> Router {
        let engine = QueryEngine::new(
            Corpus {
                name: "corpora/c".to_string(),
                display_name: "My Corpus".to_string(),
            },
            Arc::new(grounded),
            Arc::new(ScriptedModel::new(&[])),
            ResultAssembler::new(Some(Arc::new(FakeVideoSearch::returning(&["vid"]))), 1),
        );
        router(Arc::new(AppState { engine }))
    }

    async fn post_query(app: Router, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
        let request = Request::post("/query")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_query_returns_result_record() {
        let grounded = FixedGrounded::new(
            Some(r#"{"Response":"A","Video_Suggestion":"B","Keyword":"C"}"#),
            0.95,
        );
        let (status, json) = post_query(
            app(grounded),
            serde_json::json!({"query": "q", "image": {"mime_type": "image/png", "data": "cG5n"}}),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            json,
            serde_json::json!({"result": "A", "keyword": "C", "video_suggestion": "vid"})
        );
    }

    #[tokio::test]
    async fn test_error_record_maps_to_bad_gateway() {
        let (status, json) = post_query(app(FixedGrounded::failing()), serde_json::json!({"query": "q"})).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(json["error"].as_str().unwrap().contains("RESOURCE_EXHAUSTED"));
    }

    #[tokio::test]
    async fn test_health() {
        let response = app(FixedGrounded::failing())
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["corpus"], "corpora/c");
    }

    #[tokio::test]
    async fn test_blank_query_is_bad_request() {
        let grounded = FixedGrounded::new(Some("unused"), 0.95);
        let (status, json) = post_query(app(grounded), serde_json::json!({"query": "   "})).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().unwrap().contains("question is empty"));
    }
}
