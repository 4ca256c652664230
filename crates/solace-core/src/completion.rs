//! Completion service seam and the OpenAI-compatible HTTP backend.

use async_trait::async_trait;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::json;
use solace_config::CompletionConfig;
use solace_protocol::Role;
use std::time::Duration;
use thiserror::Error;

/// Errors from the external completion/vision service.
///
/// These never cross the engine boundary: every variant is absorbed into
/// deterministic fallback text.
#[derive(Debug, Error)]
pub enum CompletionError {
    /// The backend is not configured.
    #[error("completion backend unavailable")]
    Unavailable,
    /// Transport failure, including timeout.
    #[error("completion request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// The service answered with an unexpected shape.
    #[error("malformed completion response: {0}")]
    Malformed(String),
}

/// One turn handed to the completion service.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionTurn {
    /// Speaker role for the turn.
    pub role: Role,
    /// Turn content.
    pub content: String,
}

impl CompletionTurn {
    /// Build a turn from a role and content.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// External generative text/vision service.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Complete a chat exchange: persona instruction plus ordered turns.
    async fn chat(&self, system: &str, turns: &[CompletionTurn])
    -> Result<String, CompletionError>;

    /// Single-shot classification of a base64 image against a prompt.
    async fn classify_image(
        &self,
        image_base64: &str,
        prompt: &str,
    ) -> Result<String, CompletionError>;
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

/// OpenAI-compatible chat-completions backend over HTTP.
pub struct HttpCompletionBackend {
    client: reqwest::Client,
    api_base: String,
    api_key: Option<String>,
    model: String,
    vision_model: String,
}

impl HttpCompletionBackend {
    /// Build a backend from config; `None` when no API base is set, in
    /// which case the engine runs fallback-only.
    pub fn from_config(config: &CompletionConfig) -> Option<Self> {
        let api_base = config.api_base.as_deref()?.trim_end_matches('/').to_string();
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .ok()?;
        info!(
            "completion backend configured (api_base={}, model={}, timeout_secs={})",
            api_base, config.model, config.timeout_secs
        );
        Some(Self {
            client,
            api_base,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            vision_model: config
                .vision_model
                .clone()
                .unwrap_or_else(|| config.model.clone()),
        })
    }

    async fn request(&self, body: serde_json::Value) -> Result<String, CompletionError> {
        let mut request = self
            .client
            .post(format!("{}/chat/completions", self.api_base))
            .json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?.error_for_status()?;
        let parsed: ChatResponse = response.json().await?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| CompletionError::Malformed("no choices in response".to_string()))?;
        if content.trim().is_empty() {
            return Err(CompletionError::Malformed("empty content".to_string()));
        }
        Ok(content)
    }
}

#[async_trait]
impl CompletionBackend for HttpCompletionBackend {
    async fn chat(
        &self,
        system: &str,
        turns: &[CompletionTurn],
    ) -> Result<String, CompletionError> {
        let mut messages = vec![json!({"role": "system", "content": system})];
        messages.extend(
            turns
                .iter()
                .map(|turn| json!({"role": turn.role.as_str(), "content": turn.content})),
        );
        debug!(
            "requesting chat completion (model={}, turns={})",
            self.model,
            turns.len()
        );
        self.request(json!({"model": self.model, "messages": messages}))
            .await
    }

    async fn classify_image(
        &self,
        image_base64: &str,
        prompt: &str,
    ) -> Result<String, CompletionError> {
        let data_url = format!("data:image/jpeg;base64,{image_base64}");
        debug!(
            "requesting image classification (model={})",
            self.vision_model
        );
        self.request(json!({
            "model": self.vision_model,
            "messages": [{
                "role": "user",
                "content": [
                    {"type": "text", "text": prompt},
                    {"type": "image_url", "image_url": {"url": data_url}},
                ],
            }],
            "max_tokens": 10,
        }))
        .await
    }
}
