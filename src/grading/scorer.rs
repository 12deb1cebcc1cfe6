// src/grading/scorer.rs

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use super::{
    similarity::{SimilarityError, cosine_similarity, is_correct},
    timing::elapsed_ms,
};
use crate::{
    config::ScoringConfig,
    embedding::{EmbeddingClient, EmbeddingError, build_prompt, embed_with_timeout},
    repository::{QuizRepository, RepositoryError},
};

#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("question {0} not found")]
    QuestionNotFound(i64),

    #[error("question {0} has no reference answer")]
    ReferenceEmbeddingNotFound(i64),

    #[error("user {user_id} has not viewed question {question_id}")]
    ViewNotRecorded { user_id: i64, question_id: i64 },

    #[error(transparent)]
    Service(#[from] EmbeddingError),

    #[error("cannot compare embeddings: {0}")]
    Similarity(#[from] SimilarityError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl ScoringError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ScoringError::QuestionNotFound(_)
                | ScoringError::ReferenceEmbeddingNotFound(_)
                | ScoringError::ViewNotRecorded { .. }
        )
    }
}

/// Verdict for one submitted answer. Nothing has been persisted yet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreResult {
    pub contest_id: i64,
    pub similarity: f64,
    pub is_correct: bool,
    pub elapsed_ms: i64,
    pub scored_at: DateTime<Utc>,
}

/// Grades a free-text submission against the question's reference embedding.
///
/// Request-scoped and stateless: the repository and the embedding client are
/// the only suspension points.
pub struct AnswerScorer {
    repo: Arc<dyn QuizRepository>,
    embedder: Arc<dyn EmbeddingClient>,
    config: ScoringConfig,
}

impl AnswerScorer {
    pub fn new(
        repo: Arc<dyn QuizRepository>,
        embedder: Arc<dyn EmbeddingClient>,
        config: ScoringConfig,
    ) -> Self {
        Self {
            repo,
            embedder,
            config,
        }
    }

    pub async fn score_submission(
        &self,
        user_id: i64,
        question_id: i64,
        answer: &str,
    ) -> Result<ScoreResult, ScoringError> {
        self.score_submission_at(user_id, question_id, answer, Utc::now())
            .await
    }

    /// Same as `score_submission`, with the scoring time supplied by the caller.
    pub async fn score_submission_at(
        &self,
        user_id: i64,
        question_id: i64,
        answer: &str,
        now: DateTime<Utc>,
    ) -> Result<ScoreResult, ScoringError> {
        let question = self
            .repo
            .get_question(question_id)
            .await?
            .ok_or(ScoringError::QuestionNotFound(question_id))?;

        let reference = self
            .repo
            .get_reference_embedding(question_id)
            .await?
            .ok_or(ScoringError::ReferenceEmbeddingNotFound(question_id))?;

        let first_view = self
            .repo
            .get_first_view(user_id, question_id)
            .await?
            .ok_or(ScoringError::ViewNotRecorded {
                user_id,
                question_id,
            })?;

        let elapsed_ms = elapsed_ms(first_view, now);

        let prompt = build_prompt(&self.config.task, &question.query, answer);
        let embedding =
            embed_with_timeout(self.embedder.as_ref(), &prompt, self.config.embedding_timeout)
                .await
                .inspect_err(|e| {
                    tracing::warn!(
                        "Embedding failed for user {} question {}: {}",
                        user_id,
                        question_id,
                        e
                    )
                })?;

        let similarity = cosine_similarity(&embedding, &reference).inspect_err(|e| {
            tracing::error!(
                "Degenerate embedding data for question {} (user {}): {}",
                question_id,
                user_id,
                e
            )
        })?;

        let is_correct = is_correct(similarity, question.has_options());

        tracing::info!(
            "Scored user {} question {}: similarity={:.4} correct={} elapsed={}ms",
            user_id,
            question_id,
            similarity,
            is_correct,
            elapsed_ms
        );

        Ok(ScoreResult {
            contest_id: question.contest_id,
            similarity,
            is_correct,
            elapsed_ms,
            scored_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::TimeZone;

    use super::*;
    use crate::{
        embedding::StaticEmbeddingClient, models::question::Question,
        repository::MemoryQuizRepository,
    };

    const TASK: &str = "identify the age";

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 9, 30, 0).unwrap()
    }

    fn config() -> ScoringConfig {
        ScoringConfig {
            task: TASK.to_string(),
            embedding_timeout: Duration::from_millis(200),
            ..ScoringConfig::default()
        }
    }

    /// Unit vector whose cosine with `[1, 0]` is `similarity`.
    fn at_similarity(similarity: f64) -> Vec<f32> {
        vec![similarity as f32, (1.0 - similarity * similarity).sqrt() as f32]
    }

    fn setup(options: i32) -> (Arc<MemoryQuizRepository>, Question) {
        let repo = Arc::new(MemoryQuizRepository::new());
        let question = Question {
            id: 1,
            contest_id: 10,
            query: "How old is he?".to_string(),
            number_of_options: options,
            description: None,
        };
        repo.add_question(question.clone(), Some(vec![1.0, 0.0]));
        (repo, question)
    }

    fn scorer(
        repo: Arc<MemoryQuizRepository>,
        embedder: Arc<StaticEmbeddingClient>,
    ) -> AnswerScorer {
        AnswerScorer::new(repo, embedder, config())
    }

    #[tokio::test]
    async fn test_free_text_paraphrase_passes() {
        let (repo, q) = setup(0);
        repo.record_question_view(7, q.id, t0()).await.unwrap();

        let embedder = Arc::new(StaticEmbeddingClient::new());
        embedder.insert(build_prompt(TASK, &q.query, "forty-two"), at_similarity(0.97));

        let result = scorer(repo, embedder.clone())
            .score_submission_at(7, q.id, "forty-two", t0() + chrono::Duration::milliseconds(2500))
            .await
            .unwrap();

        assert!((result.similarity - 0.97).abs() < 1e-6);
        assert!(result.is_correct);
        assert_eq!(result.elapsed_ms, 2500);
        assert_eq!(result.contest_id, 10);
        assert_eq!(
            embedder.prompts(),
            vec!["task: identify the age\nquery: How old is he?\nanswer: forty-two".to_string()]
        );
    }

    #[tokio::test]
    async fn test_free_text_below_threshold_fails() {
        let (repo, q) = setup(0);
        repo.record_question_view(7, q.id, t0()).await.unwrap();
        let embedder =
            Arc::new(StaticEmbeddingClient::new().with_fallback(at_similarity(0.90)));

        let result = scorer(repo, embedder)
            .score_submission_at(7, q.id, "maybe 40", t0())
            .await
            .unwrap();
        assert!(!result.is_correct);
    }

    #[tokio::test]
    async fn test_option_question_needs_near_exact_match() {
        let (repo, q) = setup(3);
        repo.record_question_view(7, q.id, t0()).await.unwrap();

        let embedder = Arc::new(StaticEmbeddingClient::new());
        embedder.insert(build_prompt(TASK, &q.query, "B"), at_similarity(0.9995));
        embedder.insert(build_prompt(TASK, &q.query, "B."), at_similarity(0.9991));
        embedder.insert(build_prompt(TASK, &q.query, "C"), at_similarity(0.97));
        let scorer = scorer(repo, embedder);

        let exact = scorer.score_submission_at(7, q.id, "B", t0()).await.unwrap();
        assert!(exact.is_correct);

        let close = scorer.score_submission_at(7, q.id, "B.", t0()).await.unwrap();
        assert!(close.is_correct);

        let wrong = scorer.score_submission_at(7, q.id, "C", t0()).await.unwrap();
        assert!(!wrong.is_correct);
    }

    #[tokio::test]
    async fn test_missing_question() {
        let (repo, _) = setup(0);
        let embedder = Arc::new(StaticEmbeddingClient::new().with_fallback(vec![1.0, 0.0]));

        let err = scorer(repo, embedder.clone())
            .score_submission_at(7, 99, "42", t0())
            .await
            .unwrap_err();
        assert!(matches!(err, ScoringError::QuestionNotFound(99)));
        assert!(err.is_not_found());
        assert!(embedder.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_missing_reference_embedding() {
        let repo = Arc::new(MemoryQuizRepository::new());
        repo.add_question(
            Question {
                id: 2,
                contest_id: 10,
                query: "Capital of France?".to_string(),
                number_of_options: 0,
                description: None,
            },
            None,
        );
        repo.record_question_view(7, 2, t0()).await.unwrap();
        let embedder = Arc::new(StaticEmbeddingClient::new().with_fallback(vec![1.0, 0.0]));

        let err = scorer(repo, embedder)
            .score_submission_at(7, 2, "Paris", t0())
            .await
            .unwrap_err();
        assert!(matches!(err, ScoringError::ReferenceEmbeddingNotFound(2)));
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_submission_without_view() {
        let (repo, q) = setup(0);
        let embedder = Arc::new(StaticEmbeddingClient::new().with_fallback(vec![1.0, 0.0]));

        let err = scorer(repo, embedder)
            .score_submission_at(7, q.id, "42", t0())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ScoringError::ViewNotRecorded {
                user_id: 7,
                question_id: 1
            }
        ));
    }

    #[tokio::test]
    async fn test_service_failure_propagates() {
        let (repo, q) = setup(0);
        repo.record_question_view(7, q.id, t0()).await.unwrap();
        let embedder = Arc::new(StaticEmbeddingClient::failing(429));

        let err = scorer(repo, embedder)
            .score_submission_at(7, q.id, "42", t0())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ScoringError::Service(EmbeddingError::Status { status: 429, .. })
        ));
        assert!(!err.is_not_found());
    }

    #[tokio::test]
    async fn test_slow_service_times_out() {
        let (repo, q) = setup(0);
        repo.record_question_view(7, q.id, t0()).await.unwrap();
        let embedder = Arc::new(
            StaticEmbeddingClient::new()
                .with_fallback(vec![1.0, 0.0])
                .with_delay(Duration::from_secs(5)),
        );

        let err = scorer(repo, embedder)
            .score_submission_at(7, q.id, "42", t0())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ScoringError::Service(EmbeddingError::Timeout { millis: 200 })
        ));
    }

    #[tokio::test]
    async fn test_zero_embedding_is_degenerate() {
        let (repo, q) = setup(0);
        repo.record_question_view(7, q.id, t0()).await.unwrap();
        let embedder = Arc::new(StaticEmbeddingClient::new().with_fallback(vec![0.0, 0.0]));

        let err = scorer(repo, embedder)
            .score_submission_at(7, q.id, "", t0())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ScoringError::Similarity(SimilarityError::DegenerateVector { .. })
        ));
    }

    #[tokio::test]
    async fn test_wrong_dimension_is_rejected() {
        let (repo, q) = setup(0);
        repo.record_question_view(7, q.id, t0()).await.unwrap();
        let embedder = Arc::new(StaticEmbeddingClient::new().with_fallback(vec![1.0, 0.0, 0.0]));

        let err = scorer(repo, embedder)
            .score_submission_at(7, q.id, "42", t0())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ScoringError::Similarity(SimilarityError::DimensionMismatch { left: 3, right: 2 })
        ));
    }

    #[tokio::test]
    async fn test_scoring_writes_nothing() {
        let (repo, q) = setup(0);
        repo.record_question_view(7, q.id, t0()).await.unwrap();
        let embedder = Arc::new(StaticEmbeddingClient::new().with_fallback(vec![1.0, 0.0]));

        scorer(repo.clone(), embedder)
            .score_submission_at(7, q.id, "42", t0())
            .await
            .unwrap();
        assert_eq!(repo.submission_count(), 0);
    }
}
