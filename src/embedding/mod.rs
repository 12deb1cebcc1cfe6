// src/embedding/mod.rs

//! Text-embedding service access.
//!
//! The service is a black box that turns a prompt into a fixed-length vector.
//! [`EmbeddingClient`] is the seam the grading core depends on; production uses
//! [`OpenAiEmbeddingClient`], tests use [`StaticEmbeddingClient`].

mod error;
mod mock;
mod openai;

use std::time::Duration;

use async_trait::async_trait;

pub use error::EmbeddingError;
pub use mock::StaticEmbeddingClient;
pub use openai::OpenAiEmbeddingClient;

/// Produces an embedding vector for a prompt.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    async fn embed(&self, prompt: &str) -> Result<Vec<f32>, EmbeddingError>;
}

/// Composes the embedding prompt.
///
/// Field order is task, query, answer. Embeddings are not symmetric under
/// reordering, so reference answers and submissions must share this layout.
pub fn build_prompt(task: &str, query: &str, answer: &str) -> String {
    format!("task: {task}\nquery: {query}\nanswer: {answer}")
}

/// Calls `client` with an upper bound on the whole request.
pub async fn embed_with_timeout(
    client: &dyn EmbeddingClient,
    prompt: &str,
    timeout: Duration,
) -> Result<Vec<f32>, EmbeddingError> {
    tokio::time::timeout(timeout, client.embed(prompt))
        .await
        .map_err(|_| EmbeddingError::Timeout {
            millis: timeout.as_millis(),
        })?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_prompt_order() {
        let prompt = build_prompt("identify the age", "How old is he?", "42");
        assert_eq!(
            prompt,
            "task: identify the age\nquery: How old is he?\nanswer: 42"
        );
    }

    #[test]
    fn test_build_prompt_keeps_answer_last() {
        let prompt = build_prompt("t", "q", "multi\nline");
        assert!(prompt.ends_with("answer: multi\nline"));
        assert!(prompt.find("query:").unwrap() < prompt.find("answer:").unwrap());
    }

    #[tokio::test]
    async fn test_embed_with_timeout_passes_through() {
        let client = StaticEmbeddingClient::new().with_fallback(vec![0.5, 0.5]);
        let vector = embed_with_timeout(&client, "p", Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(vector, vec![0.5, 0.5]);
    }

    #[tokio::test]
    async fn test_embed_with_timeout_gives_up() {
        let client = StaticEmbeddingClient::new()
            .with_fallback(vec![1.0])
            .with_delay(Duration::from_secs(5));
        let err = embed_with_timeout(&client, "p", Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, EmbeddingError::Timeout { millis: 50 }));
    }
}
