//! OpenAI-compatible backend implementation
//!
//! Works with any server that implements the OpenAI chat completions API:
//! - Groq (https://api.groq.com/openai), the default provider
//! - vLLM (http://localhost:8000)
//! - LocalAI (http://localhost:8080)
//! - llama-server / llama.cpp (http://localhost:8080)

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};
use crate::prompts::PromptId;

use super::types::ModelReply;
use super::AIBackend;

/// OpenAI-compatible backend
///
/// Works with any server implementing the OpenAI `/v1/chat/completions` API.
///
/// # Example
///
/// ```rust,ignore
/// // Groq
/// export GROQ_API_KEY="gsk_..."
///
/// // vLLM
/// export AI_BACKEND="openai_compatible"
/// export OPENAI_COMPATIBLE_HOST="http://192.168.1.100:8000"
/// export OPENAI_COMPATIBLE_MODEL="meta-llama/Llama-3.2-3B-Instruct"
/// ```
#[derive(Clone)]
pub struct OpenAICompatibleBackend {
    http_client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    /// Name used in error messages ("groq", "openai_compatible")
    provider: String,
}

impl OpenAICompatibleBackend {
    pub fn new(base_url: &str, model: &str) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: None,
            provider: "openai_compatible".to_string(),
        }
    }

    pub fn with_api_key(base_url: &str, model: &str, api_key: &str) -> Self {
        let mut backend = Self::new(base_url, model);
        backend.api_key = Some(api_key.to_string());
        backend
    }

    /// Label the provider for error messages and logs
    pub fn with_provider(mut self, provider: &str) -> Self {
        self.provider = provider.to_string();
        self
    }

    /// Create a new instance with a different model
    pub fn with_model(&self, model: &str) -> Self {
        Self {
            model: model.to_string(),
            ..self.clone()
        }
    }

    async fn chat_completion(&self, prompt: &str) -> Result<ModelReply> {
        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature: Some(0.1),
            max_tokens: None,
            stream: false,
        };

        let mut req_builder = self
            .http_client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .json(&request);

        if let Some(ref api_key) = self.api_key {
            req_builder = req_builder.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = req_builder.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Inference(format!(
                "{} API error {}: {}",
                self.provider, status, body
            )));
        }

        let chat_response: ChatCompletionResponse = response.json().await?;

        let content = chat_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| {
                Error::Inference(format!("No response from {} API", self.provider))
            })?;

        reply_from_content(content)
    }
}

/// Message content is normally a string; some servers send a list of parts
fn reply_from_content(content: Value) -> Result<ModelReply> {
    match content {
        Value::String(text) => Ok(ModelReply::Text(text)),
        Value::Array(parts) => Ok(ModelReply::Candidates(parts)),
        Value::Null => Ok(ModelReply::Text(String::new())),
        other => Err(Error::Inference(format!(
            "Unexpected message content: {}",
            other
        ))),
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Value,
}

#[async_trait]
impl AIBackend for OpenAICompatibleBackend {
    async fn complete(&self, task: PromptId, prompt: &str) -> Result<ModelReply> {
        debug!(
            provider = %self.provider,
            model = %self.model,
            task = task.as_str(),
            "Sending chat completion"
        );
        let reply = self.chat_completion(prompt).await?;
        debug!(task = task.as_str(), raw = %reply.raw_text(), "Raw model reply");
        Ok(reply)
    }

    async fn health_check(&self) -> bool {
        let mut req_builder = self.http_client.get(format!("{}/v1/models", self.base_url));
        if let Some(ref api_key) = self.api_key {
            req_builder = req_builder.header("Authorization", format!("Bearer {}", api_key));
        }
        if let Ok(resp) = req_builder.send().await {
            if resp.status().is_success() {
                return true;
            }
        }

        // llama-server and LocalAI expose /health instead
        if let Ok(resp) = self
            .http_client
            .get(format!("{}/health", self.base_url))
            .send()
            .await
        {
            if resp.status().is_success() {
                return true;
            }
        }

        false
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn host(&self) -> &str {
        &self.base_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockInferenceServer;
    use serde_json::json;

    #[test]
    fn test_backend_new_trims_trailing_slash() {
        let backend = OpenAICompatibleBackend::new("http://localhost:12434/", "llama3.2");
        assert_eq!(backend.host(), "http://localhost:12434");
        assert_eq!(backend.model(), "llama3.2");
    }

    #[test]
    fn test_backend_with_api_key() {
        let backend =
            OpenAICompatibleBackend::with_api_key("http://localhost:12434", "gpt-4", "sk-test123");
        assert_eq!(backend.api_key, Some("sk-test123".to_string()));
        let renamed = backend.with_model("gpt-4o");
        assert_eq!(renamed.model(), "gpt-4o");
        assert_eq!(renamed.api_key, Some("sk-test123".to_string()));
    }

    #[test]
    fn test_chat_completion_request_serialization() {
        let request = ChatCompletionRequest {
            model: "deepseek-r1-distill-llama-70b".to_string(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: "Hello".to_string(),
            }],
            temperature: Some(0.1),
            max_tokens: None,
            stream: false,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["messages"][0]["content"], "Hello");
        let temp = json["temperature"].as_f64().unwrap();
        assert!((temp - 0.1).abs() < 0.001);
        assert_eq!(json["stream"], false);
        assert!(json.get("max_tokens").is_none());
    }

    #[test]
    fn test_reply_from_content() {
        assert_eq!(
            reply_from_content(json!("hi")).unwrap(),
            ModelReply::Text("hi".into())
        );
        assert_eq!(
            reply_from_content(json!([{"a": 1}])).unwrap(),
            ModelReply::Candidates(vec![json!({"a": 1})])
        );
        assert!(reply_from_content(json!(42)).is_err());
    }

    #[tokio::test]
    async fn test_health_check_unreachable() {
        let backend = OpenAICompatibleBackend::new("http://127.0.0.1:1", "llama3.2");
        assert!(!backend.health_check().await);
    }

    #[tokio::test]
    async fn test_complete_against_mock_server() {
        let server = MockInferenceServer::start().await;
        let backend = OpenAICompatibleBackend::with_api_key(&server.url(), "mock", "sk-test");

        assert!(backend.health_check().await);

        let reply = backend
            .complete(
                PromptId::ClassifyPrompt,
                "Decide whether the prompt below adds expenses or views expenses.\n\nPrompt: show my history",
            )
            .await
            .unwrap();
        assert!(matches!(reply, ModelReply::Text(_)));
        assert!(reply.raw_text().contains("view"));
    }

    #[tokio::test]
    async fn test_list_content_becomes_candidates() {
        let server = MockInferenceServer::start_with_content_parts().await;
        let backend = OpenAICompatibleBackend::new(&server.url(), "mock");

        let reply = backend
            .complete(PromptId::ClassifyPrompt, "Prompt: add 5 dollars for tea")
            .await
            .unwrap();
        assert!(matches!(reply, ModelReply::Candidates(_)));
    }

    #[tokio::test]
    async fn test_error_status_is_inference_error() {
        let server = MockInferenceServer::start_failing(503).await;
        let backend = OpenAICompatibleBackend::new(&server.url(), "mock").with_provider("groq");

        let err = backend
            .complete(PromptId::ExtractFilters, "Prompt: anything")
            .await
            .unwrap_err();
        match err {
            Error::Inference(message) => {
                assert!(message.starts_with("groq API error 503"), "{}", message)
            }
            other => panic!("expected inference error, got {:?}", other),
        }
        assert!(!backend.health_check().await);
    }
}
