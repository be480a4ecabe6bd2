//! OpenAI-compatible embeddings and chat completions client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::VaultConfig;
use crate::error::{Result, VaultError};
use crate::llm::{ChatMessage, CompletionProvider, EmbeddingProvider};

/// One client serves both provider roles. Each call is a single request;
/// failures surface as [`VaultError::Provider`] without retrying.
#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    embeddings_url: String,
    completions_url: String,
    embed_model: String,
    chat_model: String,
}

impl OpenAiClient {
    pub fn new(
        api_key: &str,
        api_base: &str,
        embed_model: impl Into<String>,
        chat_model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(VaultError::Config("missing OpenAI API key".into()));
        }
        let mut headers = HeaderMap::new();
        let auth = format!("Bearer {}", api_key.trim());
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth)
                .map_err(|_| VaultError::Config("invalid OpenAI API key".into()))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| VaultError::Config(format!("failed to build HTTP client: {e}")))?;
        let base = api_base.trim_end_matches('/');
        Ok(Self {
            client,
            embeddings_url: format!("{base}/embeddings"),
            completions_url: format!("{base}/chat/completions"),
            embed_model: embed_model.into(),
            chat_model: chat_model.into(),
        })
    }

    pub fn from_config(config: &VaultConfig) -> Result<Self> {
        Self::new(
            &config.api_key,
            &config.api_base,
            config.embed_model.clone(),
            config.chat_model.clone(),
            config.request_timeout,
        )
    }

    async fn post<B, R>(&self, url: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: for<'de> Deserialize<'de>,
    {
        let resp = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| VaultError::provider(format!("request to {url} failed: {e}")))?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(VaultError::provider(format!(
                "OpenAI returned {status}: {text}"
            )));
        }
        resp.json()
            .await
            .map_err(|e| VaultError::provider(format!("failed to parse OpenAI response: {e}")))
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let request = EmbeddingRequest {
            model: &self.embed_model,
            input: text,
        };
        let parsed: EmbeddingResponse = self.post(&self.embeddings_url, &request).await?;
        let embedding = parsed
            .data
            .into_iter()
            .next()
            .map(|entry| entry.embedding)
            .ok_or_else(|| VaultError::provider("OpenAI returned no embeddings"))?;
        debug!(dims = embedding.len(), "embedded text");
        Ok(embedding)
    }
}

#[async_trait]
impl CompletionProvider for OpenAiClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let request = ChatRequest {
            model: &self.chat_model,
            messages,
        };
        let parsed: ChatResponse = self.post(&self.completions_url, &request).await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| VaultError::provider("OpenAI returned no completion choices"))
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}
