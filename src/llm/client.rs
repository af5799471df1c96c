// file: src/llm/client.rs
// description: OpenAI-compatible chat completions client for the hosted Gemma/Mistral endpoint
// reference: https://platform.openai.com/docs/api-reference/chat

use crate::config::ModelConfig;
use crate::error::{AgentError, Result};
use crate::utils::HealthCheck;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// A chat model that turns a conversation into the next assistant reply.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String>;

    async fn health(&self) -> HealthCheck;
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ModelList {
    #[serde(default)]
    data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
}

pub struct OpenAiChatClient {
    client: Client,
    config: ModelConfig,
}

impl OpenAiChatClient {
    pub fn new(config: ModelConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AgentError::Model(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    pub async fn list_models(&self) -> Result<Vec<String>> {
        let response = self
            .authorize(self.client.get(self.config.models_url()))
            .send()
            .await
            .map_err(|e| AgentError::Model(format!("Model listing failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AgentError::Model(format!(
                "Model listing failed with status {}",
                response.status()
            )));
        }

        let list: ModelList = response
            .json()
            .await
            .map_err(|e| AgentError::Model(format!("Failed to parse model list: {}", e)))?;
        Ok(list.data.into_iter().map(|m| m.id).collect())
    }
}

#[async_trait]
impl ChatModel for OpenAiChatClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let request = ChatCompletionRequest {
            model: &self.config.model,
            messages,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            stream: false,
        };

        debug!(
            "Requesting completion from {} ({} messages)",
            self.config.model,
            messages.len()
        );

        let response = self
            .authorize(self.client.post(self.config.chat_completions_url()))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AgentError::Model(format!(
                        "Request timed out after {} seconds",
                        self.config.timeout_secs
                    ))
                } else {
                    AgentError::Model(format!("Failed to send chat request: {}", e))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AgentError::Model(format!(
                "Chat request failed with status {}: {}",
                status, error_text
            )));
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| AgentError::Model(format!("Failed to parse chat response: {}", e)))?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or_else(|| AgentError::Model("Model returned an empty response".to_string()))?;

        debug!("Received completion of {} chars", content.len());
        Ok(content)
    }

    async fn health(&self) -> HealthCheck {
        let start = Instant::now();
        match self.list_models().await {
            Ok(models) if models.iter().any(|m| m == &self.config.model) || models.is_empty() => {
                HealthCheck::healthy("model", start.elapsed())
            }
            Ok(models) => HealthCheck::degraded(
                "model",
                format!(
                    "model {} not listed by endpoint (available: {})",
                    self.config.model,
                    models.join(", ")
                ),
                start.elapsed(),
            ),
            Err(e) => HealthCheck::unhealthy("model", e.to_string(), start.elapsed()),
        }
    }
}
