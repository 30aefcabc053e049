use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{ApiConfig, EmbeddingConfig};
use crate::error::{HindsightError, Result};

/// Remote text-to-vector call. The trait keeps the cache layer and the store
/// backend-agnostic; tests substitute deterministic implementations.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Embedding client for the OpenRouter embeddings endpoint.
#[derive(Debug)]
pub struct OpenRouterEmbedder {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl OpenRouterEmbedder {
    /// Fails with a `Configuration` error when no credential is available.
    /// Callers treat that as "semantic search unavailable", not as fatal.
    pub fn new(
        api: &ApiConfig,
        embedding: &EmbeddingConfig,
        api_key: Option<String>,
    ) -> Result<Self> {
        let api_key = api_key.ok_or_else(|| {
            HindsightError::Configuration(format!(
                "{} not set; semantic search unavailable",
                api.key_env
            ))
        })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(api.timeout_secs))
            .build()
            .map_err(|e| HindsightError::Configuration(format!("HTTP client init failed: {e}")))?;

        Ok(Self {
            client,
            endpoint: format!("{}/embeddings", api.base_url.trim_end_matches('/')),
            api_key,
            model: embedding.model.clone(),
        })
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingRow>,
}

#[derive(Deserialize)]
struct EmbeddingRow {
    embedding: Vec<f32>,
}

#[async_trait]
impl Embedder for OpenRouterEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest {
                model: &self.model,
                input: text,
            })
            .send()
            .await
            .map_err(|e| HindsightError::Embedding(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(HindsightError::Embedding(format!(
                "embeddings API returned {status}"
            )));
        }

        let body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| HindsightError::Embedding(format!("malformed response: {e}")))?;

        let vector = body
            .data
            .into_iter()
            .next()
            .map(|row| row.embedding)
            .ok_or_else(|| HindsightError::Embedding("empty data array".to_string()))?;

        debug!(dims = vector.len(), "Embedded text");
        Ok(vector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_without_credential_is_configuration_error() {
        let api = ApiConfig::default();
        let embedding = EmbeddingConfig::default();
        let err = OpenRouterEmbedder::new(&api, &embedding, None).unwrap_err();
        assert!(matches!(err, HindsightError::Configuration(_)));
    }

    #[test]
    fn test_new_with_credential() {
        let api = ApiConfig::default();
        let embedding = EmbeddingConfig::default();
        let embedder =
            OpenRouterEmbedder::new(&api, &embedding, Some("sk-test".into())).unwrap();
        assert_eq!(embedder.endpoint, "https://openrouter.ai/api/v1/embeddings");
    }

    #[test]
    fn test_response_shape_parses() {
        let body: EmbeddingResponse =
            serde_json::from_str(r#"{"data":[{"embedding":[0.1,0.2,0.3]}]}"#).unwrap();
        assert_eq!(body.data[0].embedding.len(), 3);
    }
}
