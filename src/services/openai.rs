use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::config::LlmSettings;

/// Errors from the chat and embedding endpoints
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error {status}: {body}")]
    ApiError { status: u16, body: String },

    #[error("Unauthorized: invalid API key")]
    Unauthorized,

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedData>,
}

#[derive(Deserialize)]
struct EmbedData {
    embedding: Vec<f32>,
}

/// Client for an OpenAI-compatible API
///
/// Used for the free-form ranking call and for query embeddings. Chat and
/// embedding calls carry separate timeouts.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    base_url: String,
    api_key: String,
    chat_model: String,
    embedding_model: String,
    chat_timeout: Duration,
    embed_timeout: Duration,
    client: Client,
}

impl OpenAiClient {
    pub fn new(api_key: String, settings: &LlmSettings) -> Result<Self, LlmError> {
        let client = Client::builder().build()?;

        Ok(Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key,
            chat_model: settings.chat_model.clone(),
            embedding_model: settings.embedding_model.clone(),
            chat_timeout: Duration::from_secs(settings.chat_timeout_secs),
            embed_timeout: Duration::from_secs(settings.embed_timeout_secs),
            client,
        })
    }

    /// Build a client from settings, `None` when no API key is configured
    pub fn from_settings(settings: &LlmSettings) -> Result<Option<Self>, LlmError> {
        match settings.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
            Some(key) => Self::new(key.to_string(), settings).map(Some),
            None => Ok(None),
        }
    }

    pub fn chat_model(&self) -> &str {
        &self.chat_model
    }

    /// Send one system + user exchange and return the reply text
    pub async fn chat(&self, system_prompt: &str, user_prompt: &str) -> Result<String, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatRequest {
            model: &self.chat_model,
            messages: vec![
                ChatMessage { role: "system", content: system_prompt },
                ChatMessage { role: "user", content: user_prompt },
            ],
        };

        tracing::debug!("Requesting chat completion from {} ({})", url, self.chat_model);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .timeout(self.chat_timeout)
            .json(&body)
            .send()
            .await?;

        let parsed: ChatResponse = Self::check(response).await?.json().await?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| LlmError::InvalidResponse("Missing choices[0].message.content".into()))
    }

    /// Embed one text with the configured embedding model
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        let url = format!("{}/embeddings", self.base_url);
        let body = EmbedRequest {
            model: &self.embedding_model,
            input: text,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .timeout(self.embed_timeout)
            .json(&body)
            .send()
            .await?;

        let parsed: EmbedResponse = Self::check(response).await?.json().await?;

        parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .filter(|e| !e.is_empty())
            .ok_or_else(|| LlmError::InvalidResponse("Missing data[0].embedding".into()))
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, LlmError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(LlmError::Unauthorized);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read body".to_string());
        tracing::error!("LLM API returned {}: {}", status, body);
        Err(LlmError::ApiError {
            status: status.as_u16(),
            body,
        })
    }
}
