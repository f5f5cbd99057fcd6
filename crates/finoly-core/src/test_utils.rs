//! Test utilities for finoly-core
//!
//! A mock inference server speaking both the OpenAI chat-completions API and
//! the Ollama generate API, for backend tests and local development.

use std::net::SocketAddr;

use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::oneshot;

use crate::ai::mock::heuristic_reply;
use crate::prompts::PromptId;

/// How the mock server answers
#[derive(Debug, Clone, Copy)]
enum Mode {
    /// Keyword heuristics, message content as a string
    Heuristic,
    /// Keyword heuristics, message content as a list of parts
    ContentParts,
    /// Every endpoint answers with this status
    Failing(u16),
}

/// Mock inference server for testing and development
pub struct MockInferenceServer {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockInferenceServer {
    /// Start the mock server on an available port
    pub async fn start() -> Self {
        Self::start_in(Mode::Heuristic).await
    }

    /// Chat completions carry content as `[{"type": "text", ...}]` style parts
    pub async fn start_with_content_parts() -> Self {
        Self::start_in(Mode::ContentParts).await
    }

    /// Every request fails with `status`
    pub async fn start_failing(status: u16) -> Self {
        Self::start_in(Mode::Failing(status)).await
    }

    async fn start_in(mode: Mode) -> Self {
        let app = Router::new()
            .route("/v1/models", get(handle_models))
            .route("/v1/chat/completions", post(handle_chat))
            .route("/api/tags", get(handle_tags))
            .route("/api/generate", post(handle_generate))
            .with_state(mode);

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

    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockInferenceServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn failure(status: u16) -> Response {
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, "mock inference failure").into_response()
}

async fn handle_models(State(mode): State<Mode>) -> Response {
    match mode {
        Mode::Failing(status) => failure(status),
        _ => Json(json!({"data": [{"id": "mock", "object": "model"}]})).into_response(),
    }
}

async fn handle_tags(State(mode): State<Mode>) -> Response {
    match mode {
        Mode::Failing(status) => failure(status),
        _ => Json(json!({"models": [{"name": "llama3.2:latest"}]})).into_response(),
    }
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

async fn handle_chat(State(mode): State<Mode>, Json(request): Json<ChatRequest>) -> Response {
    let prompt = request
        .messages
        .last()
        .map(|m| m.content.as_str())
        .unwrap_or_default();
    let answer = heuristic_reply(detect_task(prompt), prompt);

    let content = match mode {
        Mode::Failing(status) => return failure(status),
        Mode::Heuristic => Value::String(answer),
        Mode::ContentParts => match serde_json::from_str::<Value>(&answer) {
            Ok(Value::Array(items)) => Value::Array(items),
            Ok(other) => Value::Array(vec![other]),
            Err(_) => json!([answer]),
        },
    };

    Json(json!({
        "model": request.model,
        "choices": [{"index": 0, "message": {"role": "assistant", "content": content}}],
    }))
    .into_response()
}

#[derive(Debug, Deserialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
}

async fn handle_generate(
    State(mode): State<Mode>,
    Json(request): Json<GenerateRequest>,
) -> Response {
    if let Mode::Failing(status) = mode {
        return failure(status);
    }
    let response = heuristic_reply(detect_task(&request.prompt), &request.prompt);
    Json(json!({"model": request.model, "response": response, "done": true})).into_response()
}

/// Work out which prompt a request was rendered from
///
/// These patterns match the prompt files in prompts/*.md
fn detect_task(prompt: &str) -> PromptId {
    if prompt.contains("Extract every expense") {
        PromptId::ExtractExpenses
    } else if prompt.contains("Extract the filters") {
        PromptId::ExtractFilters
    } else {
        PromptId::ClassifyPrompt
    }
}
