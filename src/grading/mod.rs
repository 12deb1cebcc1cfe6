// src/grading/mod.rs

//! Answer evaluation and contest completion.
//!
//! A submission flows through [`AnswerScorer`] (similarity + timing verdict),
//! is persisted as an immutable row, then [`CompletionAggregator`] checks
//! whether the contest is now fully answered by that user.

pub mod aggregator;
pub mod scorer;
pub mod similarity;
pub mod timing;

use std::{collections::BTreeSet, sync::Arc};

use thiserror::Error;

pub use aggregator::{AggregationPolicy, CompletionAggregator, FinalizeError, FinalizeResult};
pub use scorer::{AnswerScorer, ScoreResult, ScoringError};

use crate::{
    config::ScoringConfig,
    embedding::EmbeddingClient,
    models::submission::{NewSubmission, Submission},
    repository::{QuizRepository, RepositoryError},
};

#[derive(Debug, Error)]
pub enum GradingError {
    #[error(transparent)]
    Scoring(#[from] ScoringError),

    #[error("failed to store submission: {0}")]
    Store(#[from] RepositoryError),

    #[error(transparent)]
    Finalize(#[from] FinalizeError),
}

/// Result of one graded, stored submission.
#[derive(Debug, Clone)]
pub struct SubmissionOutcome {
    pub submission: Submission,
    pub remaining_question_ids: BTreeSet<i64>,
    pub finalize: FinalizeResult,
}

/// Wires the scorer and the aggregator to one repository.
pub struct GradingService {
    repo: Arc<dyn QuizRepository>,
    scorer: AnswerScorer,
    aggregator: CompletionAggregator,
}

impl GradingService {
    pub fn new(
        repo: Arc<dyn QuizRepository>,
        embedder: Arc<dyn EmbeddingClient>,
        config: ScoringConfig,
    ) -> Self {
        let aggregator = CompletionAggregator::new(repo.clone(), &config);
        let scorer = AnswerScorer::new(repo.clone(), embedder, config);
        Self {
            repo,
            scorer,
            aggregator,
        }
    }

    /// Scores, stores, then tries to finalize the contest.
    ///
    /// A scoring failure aborts before anything is written.
    pub async fn submit_answer(
        &self,
        user_id: i64,
        question_id: i64,
        answer: &str,
    ) -> Result<SubmissionOutcome, GradingError> {
        let score = self
            .scorer
            .score_submission(user_id, question_id, answer)
            .await?;

        let submission = self
            .repo
            .insert_submission(NewSubmission {
                user_id,
                question_id,
                answer: answer.to_string(),
                similarity: score.similarity,
                is_correct: score.is_correct,
                time_taken_ms: score.elapsed_ms,
                submitted_at: score.scored_at,
            })
            .await?;

        let finalize = self
            .aggregator
            .maybe_finalize(user_id, score.contest_id)
            .await?;

        Ok(SubmissionOutcome {
            submission,
            remaining_question_ids: finalize.remaining_question_ids.clone(),
            finalize,
        })
    }
}
