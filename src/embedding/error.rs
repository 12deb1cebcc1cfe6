use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding request failed: {reason}")]
    Request { reason: String },

    #[error("embedding request timed out after {millis}ms")]
    Timeout { millis: u128 },

    #[error("embedding service returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed embedding response: {reason}")]
    Malformed { reason: String },

    #[error("embedding has dimension {actual}, expected {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("embedding service is not configured: {reason}")]
    NotConfigured { reason: String },
}

impl From<reqwest::Error> for EmbeddingError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            EmbeddingError::Malformed {
                reason: err.to_string(),
            }
        } else {
            EmbeddingError::Request {
                reason: err.to_string(),
            }
        }
    }
}
