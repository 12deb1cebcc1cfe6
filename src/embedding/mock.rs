// src/embedding/mock.rs

use std::{
    collections::HashMap,
    sync::{Mutex, RwLock},
    time::Duration,
};

use async_trait::async_trait;

use super::{EmbeddingClient, EmbeddingError};

/// Deterministic embedding client: returns vectors registered per prompt.
/// Used by the test suites in place of the HTTP client.
#[derive(Default)]
pub struct StaticEmbeddingClient {
    vectors: RwLock<HashMap<String, Vec<f32>>>,
    fallback: Option<Vec<f32>>,
    failure_status: Option<u16>,
    delay: Option<Duration>,
    prompts: Mutex<Vec<String>>,
}

impl StaticEmbeddingClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Vector returned for prompts that have no registered vector.
    pub fn with_fallback(mut self, vector: Vec<f32>) -> Self {
        self.fallback = Some(vector);
        self
    }

    /// Every call fails as if the service answered with `status`.
    pub fn failing(status: u16) -> Self {
        Self {
            failure_status: Some(status),
            ..Self::default()
        }
    }

    /// Every call sleeps for `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn insert(&self, prompt: impl Into<String>, vector: Vec<f32>) {
        if let Ok(mut vectors) = self.vectors.write() {
            vectors.insert(prompt.into(), vector);
        }
    }

    /// Prompts received so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl EmbeddingClient for StaticEmbeddingClient {
    async fn embed(&self, prompt: &str) -> Result<Vec<f32>, EmbeddingError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(status) = self.failure_status {
            return Err(EmbeddingError::Status {
                status,
                body: "static failure".to_string(),
            });
        }

        let registered = self
            .vectors
            .read()
            .map_err(|_| EmbeddingError::Request {
                reason: "lock poisoned".to_string(),
            })?
            .get(prompt)
            .cloned();

        registered
            .or_else(|| self.fallback.clone())
            .ok_or_else(|| EmbeddingError::Malformed {
                reason: format!("no vector registered for prompt {prompt:?}"),
            })
    }
}
