// src/embedding/openai.rs

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{EmbeddingClient, EmbeddingError};
use crate::config::EmbeddingConfig;

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    input: [&'a str; 1],
    model: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// Client for an OpenAI-compatible `/v1/embeddings` endpoint.
///
/// No retries are performed here; callers decide whether to resubmit.
#[derive(Clone)]
pub struct OpenAiEmbeddingClient {
    http: reqwest::Client,
    config: EmbeddingConfig,
}

impl OpenAiEmbeddingClient {
    pub fn new(config: EmbeddingConfig) -> Result<Self, EmbeddingError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| EmbeddingError::Request {
                reason: e.to_string(),
            })?;

        Ok(Self { http, config })
    }
}

#[async_trait]
impl EmbeddingClient for OpenAiEmbeddingClient {
    async fn embed(&self, prompt: &str) -> Result<Vec<f32>, EmbeddingError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| EmbeddingError::NotConfigured {
                reason: "OPENAI_API_KEY is not set".to_string(),
            })?;

        let response = self
            .http
            .post(&self.config.api_url)
            .bearer_auth(api_key)
            .json(&EmbeddingRequest {
                input: [prompt],
                model: &self.config.model,
            })
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    EmbeddingError::Timeout {
                        millis: self.config.timeout.as_millis(),
                    }
                } else {
                    EmbeddingError::from(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let payload: EmbeddingResponse = response.json().await?;
        let embedding = payload
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| EmbeddingError::Malformed {
                reason: "response contained no embeddings".to_string(),
            })?;

        if embedding.len() != self.config.dimension {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.config.dimension,
                actual: embedding.len(),
            });
        }

        tracing::debug!(
            "Embedded prompt of {} bytes with {}",
            prompt.len(),
            self.config.model
        );

        Ok(embedding)
    }
}
