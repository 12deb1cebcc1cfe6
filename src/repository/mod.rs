// src/repository/mod.rs

//! Data access used by the grading core.
//!
//! Every method returns plain records; absence is `Ok(None)` rather than an
//! error so callers decide what a missing row means.

mod memory;
mod postgres;

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

pub use memory::MemoryQuizRepository;
pub use postgres::PgQuizRepository;

use crate::models::{
    question::Question,
    result::{ContestResult, NewContestResult},
    submission::{NewSubmission, Submission},
};

#[derive(Debug, Error)]
pub enum RepositoryError {
    /// A row with the same unique key already exists.
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match err.as_database_error() {
            Some(db_err) if db_err.is_unique_violation() => RepositoryError::UniqueViolation(
                db_err.constraint().unwrap_or("unknown").to_string(),
            ),
            _ => RepositoryError::Database(err.to_string()),
        }
    }
}

#[async_trait]
pub trait QuizRepository: Send + Sync {
    async fn get_question(&self, question_id: i64) -> Result<Option<Question>, RepositoryError>;

    async fn get_reference_embedding(
        &self,
        question_id: i64,
    ) -> Result<Option<Vec<f32>>, RepositoryError>;

    async fn get_first_view(
        &self,
        user_id: i64,
        question_id: i64,
    ) -> Result<Option<DateTime<Utc>>, RepositoryError>;

    /// Records the first time a user retrieved a question.
    /// Later calls keep the original timestamp, which is returned.
    async fn record_question_view(
        &self,
        user_id: i64,
        question_id: i64,
        viewed_at: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, RepositoryError>;

    async fn list_question_ids(&self, contest_id: i64) -> Result<BTreeSet<i64>, RepositoryError>;

    /// Every submission of `user_id` to questions of `contest_id`, oldest first.
    async fn list_user_submissions(
        &self,
        user_id: i64,
        contest_id: i64,
    ) -> Result<Vec<Submission>, RepositoryError>;

    async fn insert_submission(
        &self,
        record: NewSubmission,
    ) -> Result<Submission, RepositoryError>;

    /// Fails with `RepositoryError::UniqueViolation` if the user already has a
    /// result for the contest.
    async fn insert_aggregate_result(
        &self,
        record: NewContestResult,
    ) -> Result<ContestResult, RepositoryError>;

    async fn get_aggregate_result(
        &self,
        user_id: i64,
        contest_id: i64,
    ) -> Result<Option<ContestResult>, RepositoryError>;
}
