//! Finoly Web Server
//!
//! Axum-based REST API for the Finoly expense assistant.
//!
//! - `POST /api/expense-tracker` runs the interpreter over a free-text prompt
//! - Permissive CORS unless origins are configured
//! - Sanitized error responses (internal errors are logged, never returned)

use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};
use tracing::{error, info, warn};

use finoly_core::ai::{AIBackend, AIClient};
use finoly_core::{ExpenseInterpreter, PromptLibrary};

mod handlers;

/// Version reported by `GET /`
pub const API_VERSION: &str = "1.0.0";

/// Environment variable holding comma-separated CORS origins
pub const ALLOWED_ORIGINS_ENV: &str = "FINOLY_ALLOWED_ORIGINS";

/// Server configuration
#[derive(Clone, Debug, Default)]
pub struct ServerConfig {
    /// Allowed CORS origins (empty = any origin)
    pub allowed_origins: Vec<String>,
}

impl ServerConfig {
    /// Read allowed origins from `FINOLY_ALLOWED_ORIGINS`
    pub fn from_env() -> Self {
        Self {
            allowed_origins: std::env::var(ALLOWED_ORIGINS_ENV)
                .map(|v| parse_origins(&v))
                .unwrap_or_default(),
        }
    }
}

/// Split a comma-separated origin list, dropping blanks
pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Shared application state
pub struct AppState {
    /// None when no inference backend is configured
    pub interpreter: Option<ExpenseInterpreter<AIClient>>,
}

/// Create the application router
///
/// `ai` is the inference backend; pass `None` to run without one, in which
/// case the expense tracker answers 500.
pub fn create_router(config: ServerConfig, ai: Option<AIClient>) -> Router {
    create_router_with_prompts(config, ai, PromptLibrary::new())
}

/// Create the application router with an explicit prompt library (for testing)
pub fn create_router_with_prompts(
    config: ServerConfig,
    ai: Option<AIClient>,
    prompts: PromptLibrary,
) -> Router {
    match ai {
        Some(ref client) => info!(
            "AI backend configured: {} (model: {})",
            client.host(),
            client.model()
        ),
        None => info!("ℹ️  AI backend not configured (set GROQ_API_KEY or AI_BACKEND to enable)"),
    }

    let state = Arc::new(AppState {
        interpreter: ai.map(|client| ExpenseInterpreter::new(client, prompts)),
    });

    let api_routes = Router::new()
        .route("/health", get(handlers::health))
        .route("/hello", get(handlers::hello))
        .route("/expense-tracker", post(handlers::expense_tracker));

    let cors = if config.allowed_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE])
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE])
    };

    Router::new()
        .route("/", get(handlers::home))
        .nest("/api", api_routes)
        .fallback(handlers::not_found)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
}

/// Start the server with the backend from the environment
pub async fn serve(host: &str, port: u16) -> anyhow::Result<()> {
    serve_with_config(host, port, ServerConfig::from_env(), AIClient::from_env()).await
}

/// Start the server with custom configuration
pub async fn serve_with_config(
    host: &str,
    port: u16,
    config: ServerConfig,
    ai: Option<AIClient>,
) -> anyhow::Result<()> {
    if let Some(ref client) = ai {
        check_ai_connection(client).await;
    }

    let app = create_router(config, ai);
    let addr = format!("{}:{}", host, port);

    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Check and log AI backend connection status
async fn check_ai_connection(client: &AIClient) {
    if client.health_check().await {
        info!(
            "✅ AI backend connected: {} (model: {})",
            client.host(),
            client.model()
        );
    } else {
        warn!(
            "⚠️  AI backend configured but not responding: {} (model: {})",
            client.host(),
            client.model()
        );
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Message returned in place of internal error details
const GENERIC_ERROR_MESSAGE: &str = "An internal error occurred";

/// Application error type with proper HTTP status codes
///
/// Serialized as `{"error": <title>, "message": <detail>}`.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    error: String,
    message: String,
    internal: Option<anyhow::Error>,
}

impl AppError {
    pub fn bad_request(error: &str, msg: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error: error.to_string(),
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn not_found(error: &str, msg: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            error: error.to_string(),
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn internal(error: &str, msg: &str) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error: error.to_string(),
            message: msg.to_string(),
            internal: None,
        }
    }

    /// 500 with a caller-chosen title; the cause is logged, not returned
    pub fn failed(error: &str, cause: impl Into<anyhow::Error>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error: error.to_string(),
            message: GENERIC_ERROR_MESSAGE.to_string(),
            internal: Some(cause.into()),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the full internal error if present
        if let Some(err) = &self.internal {
            error!(error = %err, "Internal error");
        }

        let body = Json(serde_json::json!({
            "error": self.error,
            "message": self.message,
        }));

        (self.status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::failed("Internal Server Error", err)
    }
}

#[cfg(test)]
mod tests;
