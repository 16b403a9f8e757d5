//! OpenAI-compatible embedding and chat-completion provider.
//!
//! One client implements both collaborator traits, mirroring how a deployment
//! typically points the embedding and generation calls at the same API. The
//! base URL is configurable so self-hosted gateways (or a mock server in
//! tests) can stand in for the hosted endpoint.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use super::{AnswerGenerator, EmbeddingProvider};
use crate::types::RagError;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1/";
const DEFAULT_EMBED_MODEL: &str = "text-embedding-3-small";
const DEFAULT_CHAT_MODEL: &str = "gpt-5.2";

/// Connection settings for an OpenAI-compatible API.
#[derive(Clone, Debug)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: Url,
    pub embed_model: String,
    pub chat_model: String,
}

impl OpenAiConfig {
    /// Settings for the hosted endpoint with the default models.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: Url::parse(DEFAULT_BASE_URL).expect("static url parses"),
            embed_model: DEFAULT_EMBED_MODEL.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
        }
    }

    /// Reads `OPENAI_API_KEY` (required) and the optional
    /// `OPENAI_BASE_URL` / `OPENAI_EMBED_MODEL` / `OPENAI_CHAT_MODEL`
    /// overrides, honoring a `.env` file when present.
    pub fn from_env() -> Result<Self, RagError> {
        dotenvy::dotenv().ok();
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| RagError::InvalidConfig("OPENAI_API_KEY is not set".to_string()))?;
        let mut config = Self::new(api_key);
        if let Ok(base) = std::env::var("OPENAI_BASE_URL") {
            config = config.with_base_url(&base)?;
        }
        if let Ok(model) = std::env::var("OPENAI_EMBED_MODEL") {
            config.embed_model = model;
        }
        if let Ok(model) = std::env::var("OPENAI_CHAT_MODEL") {
            config.chat_model = model;
        }
        Ok(config)
    }

    /// Points the client at a different OpenAI-compatible endpoint.
    pub fn with_base_url(mut self, base_url: &str) -> Result<Self, RagError> {
        // Endpoint paths are joined onto the base, so it must end in '/'.
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        self.base_url = Url::parse(&normalized)
            .map_err(|err| RagError::InvalidConfig(format!("invalid base url: {err}")))?;
        Ok(self)
    }

    #[must_use]
    pub fn with_embed_model(mut self, model: impl Into<String>) -> Self {
        self.embed_model = model.into();
        self
    }

    #[must_use]
    pub fn with_chat_model(mut self, model: impl Into<String>) -> Self {
        self.chat_model = model.into();
        self
    }
}

/// HTTP client implementing both provider traits.
#[derive(Clone, Debug)]
pub struct OpenAiProvider {
    http: Client,
    config: OpenAiConfig,
}

impl OpenAiProvider {
    pub fn new(config: OpenAiConfig) -> Self {
        Self {
            http: Client::new(),
            config,
        }
    }

    /// Builds the provider from environment configuration.
    pub fn from_env() -> Result<Self, RagError> {
        Ok(Self::new(OpenAiConfig::from_env()?))
    }

    fn endpoint(&self, path: &str) -> Result<Url, RagError> {
        self.config
            .base_url
            .join(path)
            .map_err(|err| RagError::InvalidConfig(format!("invalid endpoint path: {err}")))
    }
}

#[derive(Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingObject>,
}

#[derive(Deserialize)]
struct EmbeddingObject {
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[async_trait]
impl EmbeddingProvider for OpenAiProvider {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = EmbeddingsRequest {
            model: &self.config.embed_model,
            input: texts,
        };
        let response = self
            .http
            .post(self.endpoint("embeddings")?)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|err| RagError::Embedding(err.to_string()))?;

        let mut payload: EmbeddingsResponse = response
            .json()
            .await
            .map_err(|err| RagError::Embedding(format!("malformed response: {err}")))?;

        if payload.data.len() != texts.len() {
            return Err(RagError::Embedding(format!(
                "requested {} embeddings, provider returned {}",
                texts.len(),
                payload.data.len()
            )));
        }
        // The index field defines ordering, not arrival order.
        payload.data.sort_by_key(|entry| entry.index);
        Ok(payload
            .data
            .into_iter()
            .map(|entry| entry.embedding)
            .collect())
    }
}

#[async_trait]
impl AnswerGenerator for OpenAiProvider {
    async fn generate(
        &self,
        system_prompt: &str,
        question: &str,
        context: &str,
    ) -> Result<String, RagError> {
        let request = ChatRequest {
            model: &self.config.chat_model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: format!("QUESTION:\n{question}\n\nCONTEXT:\n{context}"),
                },
            ],
        };

        let response = self
            .http
            .post(self.endpoint("chat/completions")?)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|err| RagError::Generation(err.to_string()))?;

        let payload: ChatResponse = response
            .json()
            .await
            .map_err(|err| RagError::Generation(format!("malformed response: {err}")))?;

        let answer = payload
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| RagError::Generation("provider returned no choices".to_string()))?;
        Ok(answer.trim().to_string())
    }
}
