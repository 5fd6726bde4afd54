//! Test utilities for tally-core
//!
//! A mock Ollama server that answers `classify_services` prompts, for
//! integration tests and for trying the CLI without a model server.

use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::sync::oneshot;

use crate::ai::MockBackend;

/// What the mock server does with a generate request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockBehavior {
    /// Group the memos by brand and answer with JSON wrapped in prose
    Classify,
    /// Answer without any JSON
    Garbage,
    /// Valid JSON that leaves out the last memo
    Incomplete,
    /// HTTP 500
    ServerError,
}

/// Mock Ollama server for testing and development
pub struct MockOllamaServer {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockOllamaServer {
    /// Start a well-behaved mock server on an available port
    pub async fn start() -> Self {
        Self::start_with(MockBehavior::Classify).await
    }

    /// Start a mock server with the given behavior
    pub async fn start_with(behavior: MockBehavior) -> Self {
        let app = Router::new()
            .route("/api/tags", get(handle_tags))
            .route("/api/generate", post(handle_generate))
            .with_state(behavior);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Get the base URL for this mock server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockOllamaServer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Ollama tags endpoint response (health check)
async fn handle_tags() -> Json<TagsResponse> {
    Json(TagsResponse {
        models: vec![ModelInfo {
            name: "llama3.2:latest".to_string(),
            modified_at: "2024-01-01T00:00:00Z".to_string(),
            size: 4_000_000_000,
        }],
    })
}

/// Ollama generate endpoint
async fn handle_generate(
    State(behavior): State<MockBehavior>,
    Json(request): Json<GenerateRequest>,
) -> Response {
    let memos = extract_memos_from_prompt(&request.prompt);

    let response = match behavior {
        MockBehavior::ServerError => {
            return (StatusCode::INTERNAL_SERVER_ERROR, "model crashed").into_response();
        }
        MockBehavior::Garbage => "I'm not sure what these charges are.".to_string(),
        MockBehavior::Classify => {
            let groups = MockBackend::classify_memos(&memos);
            format!(
                "Here are the services:\n```json\n{}\n```",
                serde_json::to_string_pretty(&groups).unwrap()
            )
        }
        MockBehavior::Incomplete => {
            let mut groups = MockBackend::classify_memos(&memos);
            if let Some(last) = groups.last_mut() {
                last.original_comments.pop();
            }
            serde_json::to_string(&groups).unwrap()
        }
    };

    Json(GenerateResponse {
        model: request.model,
        response,
        done: true,
    })
    .into_response()
}

/// Pull the JSON array of memos out of a rendered classify_services prompt
fn extract_memos_from_prompt(prompt: &str) -> Vec<String> {
    let Some(start) = prompt.find('[') else {
        return Vec::new();
    };
    serde_json::Deserializer::from_str(&prompt[start..])
        .into_iter::<Vec<String>>()
        .next()
        .and_then(|r| r.ok())
        .unwrap_or_default()
}

// Request/Response types for the mock server

#[derive(Debug, Serialize)]
struct TagsResponse {
    models: Vec<ModelInfo>,
}

#[derive(Debug, Serialize)]
struct ModelInfo {
    name: String,
    modified_at: String,
    size: u64,
}

#[derive(Debug, Deserialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
    #[allow(dead_code)]
    stream: bool,
}

#[derive(Debug, Serialize)]
struct GenerateResponse {
    model: String,
    response: String,
    done: bool,
}
