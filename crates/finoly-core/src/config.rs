//! Inference backend configuration
//!
//! Environment variables:
//! - `AI_BACKEND`: groq (default), openai_compatible, ollama, mock
//! - `GROQ_API_KEY` (required for groq), `GROQ_MODEL`
//! - `OPENAI_COMPATIBLE_HOST` (required), `OPENAI_COMPATIBLE_MODEL`, `OPENAI_COMPATIBLE_API_KEY`
//! - `OLLAMA_HOST` (required), `OLLAMA_MODEL`

use std::fmt;

use tracing::warn;

pub const GROQ_HOST: &str = "https://api.groq.com/openai";
pub const DEFAULT_GROQ_MODEL: &str = "deepseek-r1-distill-llama-70b";
pub const DEFAULT_OPENAI_COMPATIBLE_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_OLLAMA_MODEL: &str = "llama3.2";

/// Which inference provider to talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Groq,
    OpenAICompatible,
    Ollama,
    Mock,
}

impl BackendKind {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "groq" => Some(Self::Groq),
            "openai_compatible" | "openai" | "vllm" | "localai" | "llamacpp" => {
                Some(Self::OpenAICompatible)
            }
            "ollama" => Some(Self::Ollama),
            "mock" => Some(Self::Mock),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Groq => "groq",
            Self::OpenAICompatible => "openai_compatible",
            Self::Ollama => "ollama",
            Self::Mock => "mock",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolved settings for one inference backend
#[derive(Clone, PartialEq, Eq)]
pub struct AIConfig {
    pub backend: BackendKind,
    pub host: String,
    pub model: String,
    pub api_key: Option<String>,
}

// Keep the key out of logs
impl fmt::Debug for AIConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AIConfig")
            .field("backend", &self.backend)
            .field("host", &self.host)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl AIConfig {
    /// Read configuration from the process environment
    ///
    /// Returns `None` when the selected backend is missing a required variable.
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Empty values count as unset
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let name = var("AI_BACKEND").unwrap_or_else(|| "groq".to_string());
        let backend = BackendKind::parse(&name).unwrap_or_else(|| {
            warn!(backend = %name, "Unknown AI_BACKEND, falling back to groq");
            BackendKind::Groq
        });

        match backend {
            BackendKind::Groq => Some(Self {
                backend,
                host: GROQ_HOST.to_string(),
                model: var("GROQ_MODEL").unwrap_or_else(|| DEFAULT_GROQ_MODEL.to_string()),
                api_key: Some(var("GROQ_API_KEY")?),
            }),
            BackendKind::OpenAICompatible => Some(Self {
                backend,
                host: var("OPENAI_COMPATIBLE_HOST")?,
                model: var("OPENAI_COMPATIBLE_MODEL")
                    .unwrap_or_else(|| DEFAULT_OPENAI_COMPATIBLE_MODEL.to_string()),
                api_key: var("OPENAI_COMPATIBLE_API_KEY"),
            }),
            BackendKind::Ollama => Some(Self {
                backend,
                host: var("OLLAMA_HOST")?,
                model: var("OLLAMA_MODEL").unwrap_or_else(|| DEFAULT_OLLAMA_MODEL.to_string()),
                api_key: None,
            }),
            BackendKind::Mock => Some(Self {
                backend,
                host: "mock://localhost".to_string(),
                model: "mock".to_string(),
                api_key: None,
            }),
        }
    }
}
