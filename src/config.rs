// src/config.rs

use std::{env, time::Duration};

use dotenvy::dotenv;

use crate::grading::AggregationPolicy;

/// Similarity a free-text answer must reach to be graded correct.
pub const FREE_TEXT_THRESHOLD: f64 = 0.95;

/// Similarity a multiple-choice answer must reach to be graded correct.
pub const OPTION_THRESHOLD: f64 = 0.999;

pub const DEFAULT_EMBEDDING_API_URL: &str = "https://api.openai.com/v1/embeddings";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 1536;
pub const DEFAULT_EMBEDDING_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_EMBEDDING_TASK: &str = "年齢を表す数字を正しく識別せよ";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
    pub embedding: EmbeddingConfig,
    pub aggregation_policy: AggregationPolicy,
}

/// Settings for the remote text-embedding service.
#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    pub api_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub dimension: usize,
    pub timeout: Duration,
    /// Task description placed first in every embedding prompt.
    pub task: String,
}

/// Explicit settings handed to the scorer and the aggregator at construction.
#[derive(Debug, Clone)]
pub struct ScoringConfig {
    pub task: String,
    /// Upper bound on a single embedding request made while scoring.
    pub embedding_timeout: Duration,
    pub aggregation_policy: AggregationPolicy,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            task: DEFAULT_EMBEDDING_TASK.to_string(),
            embedding_timeout: Duration::from_secs(DEFAULT_EMBEDDING_TIMEOUT_SECS),
            aggregation_policy: AggregationPolicy::default(),
        }
    }
}

impl Config {
    /// Reads the environment. Missing required variables and an unknown
    /// `AGGREGATION_POLICY` panic; ignored optional values are returned as
    /// warnings so they can be logged once tracing is up.
    pub fn from_env() -> (Self, Vec<String>) {
        dotenv().ok();

        let mut warnings = Vec::new();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET must be set");

        let jwt_expiration = parse_or(
            "JWT_EXPIRATION",
            env::var("JWT_EXPIRATION").ok(),
            3600,
            &mut warnings,
        );

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let embedding = EmbeddingConfig {
            api_url: env::var("EMBEDDING_API_URL")
                .unwrap_or_else(|_| DEFAULT_EMBEDDING_API_URL.to_string()),
            api_key: env::var("OPENAI_API_KEY").ok(),
            model: env::var("EMBEDDING_MODEL")
                .unwrap_or_else(|_| DEFAULT_EMBEDDING_MODEL.to_string()),
            dimension: parse_or(
                "EMBEDDING_DIMENSION",
                env::var("EMBEDDING_DIMENSION").ok(),
                DEFAULT_EMBEDDING_DIMENSION,
                &mut warnings,
            ),
            timeout: Duration::from_secs(parse_or(
                "EMBEDDING_TIMEOUT_SECS",
                env::var("EMBEDDING_TIMEOUT_SECS").ok(),
                DEFAULT_EMBEDDING_TIMEOUT_SECS,
                &mut warnings,
            )),
            task: env::var("EMBEDDING_TASK")
                .unwrap_or_else(|_| DEFAULT_EMBEDDING_TASK.to_string()),
        };

        let aggregation_policy = parse_policy(env::var("AGGREGATION_POLICY").ok());

        let config = Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            admin_username: env::var("ADMIN_USERNAME").ok(),
            admin_password: env::var("ADMIN_PASSWORD").ok(),
            embedding,
            aggregation_policy,
        };

        (config, warnings)
    }

    pub fn scoring(&self) -> ScoringConfig {
        ScoringConfig {
            task: self.embedding.task.clone(),
            embedding_timeout: self.embedding.timeout,
            aggregation_policy: self.aggregation_policy,
        }
    }
}

fn parse_or<T: std::str::FromStr>(
    key: &str,
    raw: Option<String>,
    default: T,
    warnings: &mut Vec<String>,
) -> T {
    match raw {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            warnings.push(format!("Ignoring invalid value for {}: {:?}", key, raw));
            default
        }),
        None => default,
    }
}

/// Unset means the default policy; anything unrecognised is fatal because it
/// changes what the ranking counts.
fn parse_policy(raw: Option<String>) -> AggregationPolicy {
    match raw {
        Some(raw) => raw
            .parse()
            .unwrap_or_else(|e| panic!("AGGREGATION_POLICY is invalid: {}", e)),
        None => AggregationPolicy::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_or_collects_warning() {
        let mut warnings = Vec::new();
        let raw = Some("768".to_string());
        let dimension = parse_or("EMBEDDING_DIMENSION", raw, 1536usize, &mut warnings);
        assert_eq!(dimension, 768);
        assert!(warnings.is_empty());

        let raw = Some("big".to_string());
        let dimension = parse_or("EMBEDDING_DIMENSION", raw, 1536usize, &mut warnings);
        assert_eq!(dimension, 1536);
        assert_eq!(parse_or("JWT_EXPIRATION", None, 3600u64, &mut warnings), 3600);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("EMBEDDING_DIMENSION"));
    }

    #[test]
    fn test_policy_defaults_when_unset() {
        assert_eq!(parse_policy(None), AggregationPolicy::LatestPerQuestion);
        assert_eq!(parse_policy(Some("all".to_string())), AggregationPolicy::AllSubmissions);
    }

    #[test]
    #[should_panic(expected = "AGGREGATION_POLICY is invalid")]
    fn test_unknown_policy_is_fatal() {
        parse_policy(Some("every".to_string()));
    }
}
