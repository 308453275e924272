//! HTTP-backed embedder for an Ollama-compatible `/api/embeddings` endpoint

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

use super::Embedder;

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

/// Calls a local Ollama-compatible server's embeddings endpoint.
pub struct HttpEmbedder {
    http_client: Client,
    base_url: String,
    model: String,
}

impl HttpEmbedder {
    pub fn new(base_url: &str, model: &str) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        }
    }

    /// Build from `EMBEDDER_HOST` / `EMBEDDER_MODEL` environment variables.
    /// Returns `None` if `EMBEDDER_HOST` is unset.
    pub fn from_env() -> Option<Self> {
        let host = std::env::var("EMBEDDER_HOST").ok()?;
        let model = std::env::var("EMBEDDER_MODEL").unwrap_or_else(|_| "nomic-embed-text".into());
        Some(Self::new(&host, &model))
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let request = EmbedRequest {
            model: &self.model,
            prompt: text,
        };

        let response = self
            .http_client
            .post(format!("{}/api/embeddings", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Dependency(format!("embedder request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::Dependency(format!(
                "embedder returned status {}",
                response.status()
            )));
        }

        let parsed: EmbedResponse = response
            .json()
            .await
            .map_err(|e| Error::Dependency(format!("malformed embedder response: {e}")))?;

        Ok(parsed.embedding)
    }

    fn model(&self) -> &str {
        &self.model
    }
}
