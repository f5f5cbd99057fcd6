//! Pluggable inference backend abstraction
//!
//! This module provides a backend-agnostic interface for the one thing the
//! interpreter needs from a model: turn a rendered prompt into a reply.
//!
//! # Architecture
//!
//! - `AIBackend` trait: defines the interface for all backends
//! - `AIClient` enum: concrete wrapper providing Clone + compile-time dispatch
//! - Backend implementations: `OpenAICompatibleBackend` (Groq and friends),
//!   `OllamaBackend`, `MockBackend`
//!
//! # Usage
//!
//! ```rust,ignore
//! let ai = AIClient::from_env();
//!
//! if let Some(ref client) = ai {
//!     let reply = client.complete(PromptId::ClassifyPrompt, &rendered).await?;
//!     let analysis: PromptAnalysis = parse_reply(&reply)?;
//! }
//! ```
//!
//! Configuration is read by [`crate::config::AIConfig`].

pub(crate) mod mock;
mod ollama;
mod openai_compatible;
pub mod parsing;
pub mod types;

pub use mock::{MockBackend, ScriptedReply};
pub use ollama::OllamaBackend;
pub use openai_compatible::OpenAICompatibleBackend;
pub use types::*;

use async_trait::async_trait;

use crate::config::{AIConfig, BackendKind};
use crate::error::Result;
use crate::prompts::PromptId;

/// Trait defining the interface for all inference backends
///
/// Backends should be Send + Sync to allow use across async tasks.
#[async_trait]
pub trait AIBackend: Send + Sync {
    /// Run one completion for a rendered prompt
    ///
    /// `task` names the prompt the text was rendered from; real backends only
    /// log it, the mock uses it to pick a canned answer.
    async fn complete(&self, task: PromptId, prompt: &str) -> Result<ModelReply>;

    /// Check if the backend is reachable
    async fn health_check(&self) -> bool;

    /// Get the model name (for logging)
    fn model(&self) -> &str;

    /// Get the host URL (for logging)
    fn host(&self) -> &str;
}

/// Concrete AI client enum
///
/// Provides Clone and compile-time dispatch without Box<dyn> overhead.
#[derive(Clone)]
pub enum AIClient {
    /// Chat-completions API: Groq, vLLM, LocalAI, llama-server, etc.
    OpenAICompatible(OpenAICompatibleBackend),
    /// Ollama backend (HTTP API)
    Ollama(OllamaBackend),
    /// Mock backend for testing and offline development
    Mock(MockBackend),
}

impl AIClient {
    /// Create an AI client from environment variables
    ///
    /// Returns None if the selected backend is missing required settings.
    pub fn from_env() -> Option<Self> {
        AIConfig::from_env().map(|config| Self::from_config(&config))
    }

    pub fn from_config(config: &AIConfig) -> Self {
        match config.backend {
            BackendKind::Groq | BackendKind::OpenAICompatible => {
                let backend = match config.api_key {
                    Some(ref key) => {
                        OpenAICompatibleBackend::with_api_key(&config.host, &config.model, key)
                    }
                    None => OpenAICompatibleBackend::new(&config.host, &config.model),
                };
                AIClient::OpenAICompatible(backend.with_provider(config.backend.as_str()))
            }
            BackendKind::Ollama => AIClient::Ollama(OllamaBackend::new(&config.host, &config.model)),
            BackendKind::Mock => AIClient::Mock(MockBackend::new()),
        }
    }

    /// Create an Ollama backend directly
    pub fn ollama(host: &str, model: &str) -> Self {
        AIClient::Ollama(OllamaBackend::new(host, model))
    }

    /// Create a mock backend for testing
    pub fn mock() -> Self {
        AIClient::Mock(MockBackend::new())
    }

    /// Create a new instance with a different model
    pub fn with_model(&self, model: &str) -> Self {
        match self {
            AIClient::OpenAICompatible(b) => AIClient::OpenAICompatible(b.with_model(model)),
            AIClient::Ollama(b) => AIClient::Ollama(b.with_model(model)),
            AIClient::Mock(b) => AIClient::Mock(b.with_model(model)),
        }
    }
}

// Implement AIBackend for AIClient by delegating to the inner backend
#[async_trait]
impl AIBackend for AIClient {
    async fn complete(&self, task: PromptId, prompt: &str) -> Result<ModelReply> {
        match self {
            AIClient::OpenAICompatible(b) => b.complete(task, prompt).await,
            AIClient::Ollama(b) => b.complete(task, prompt).await,
            AIClient::Mock(b) => b.complete(task, prompt).await,
        }
    }

    async fn health_check(&self) -> bool {
        match self {
            AIClient::OpenAICompatible(b) => b.health_check().await,
            AIClient::Ollama(b) => b.health_check().await,
            AIClient::Mock(b) => b.health_check().await,
        }
    }

    fn model(&self) -> &str {
        match self {
            AIClient::OpenAICompatible(b) => b.model(),
            AIClient::Ollama(b) => b.model(),
            AIClient::Mock(b) => b.model(),
        }
    }

    fn host(&self) -> &str {
        match self {
            AIClient::OpenAICompatible(b) => b.host(),
            AIClient::Ollama(b) => b.host(),
            AIClient::Mock(b) => b.host(),
        }
    }
}
