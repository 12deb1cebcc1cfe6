// src/repository/postgres.rs

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::{QuizRepository, RepositoryError};
use crate::models::{
    question::Question,
    result::{ContestResult, NewContestResult},
    submission::{NewSubmission, Submission},
};

/// `QuizRepository` backed by the Postgres pool.
#[derive(Clone)]
pub struct PgQuizRepository {
    pool: PgPool,
}

impl PgQuizRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QuizRepository for PgQuizRepository {
    async fn get_question(&self, question_id: i64) -> Result<Option<Question>, RepositoryError> {
        let question = sqlx::query_as::<_, Question>(
            r#"
            SELECT id, contest_id, query, number_of_options, description
            FROM questions
            WHERE id = $1
            "#,
        )
        .bind(question_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(question)
    }

    async fn get_reference_embedding(
        &self,
        question_id: i64,
    ) -> Result<Option<Vec<f32>>, RepositoryError> {
        let embedding = sqlx::query_scalar::<_, Vec<f32>>(
            "SELECT embedding FROM answer_embeddings WHERE question_id = $1",
        )
        .bind(question_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(embedding)
    }

    async fn get_first_view(
        &self,
        user_id: i64,
        question_id: i64,
    ) -> Result<Option<DateTime<Utc>>, RepositoryError> {
        let viewed_at = sqlx::query_scalar::<_, DateTime<Utc>>(
            "SELECT viewed_at FROM question_first_views WHERE user_id = $1 AND question_id = $2",
        )
        .bind(user_id)
        .bind(question_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(viewed_at)
    }

    async fn record_question_view(
        &self,
        user_id: i64,
        question_id: i64,
        viewed_at: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO question_first_views (user_id, question_id, viewed_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, question_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(question_id)
        .bind(viewed_at)
        .execute(&self.pool)
        .await?;

        self.get_first_view(user_id, question_id)
            .await?
            .ok_or_else(|| {
                RepositoryError::Database("first view vanished after insert".to_string())
            })
    }

    async fn list_question_ids(&self, contest_id: i64) -> Result<BTreeSet<i64>, RepositoryError> {
        let ids = sqlx::query_scalar::<_, i64>("SELECT id FROM questions WHERE contest_id = $1")
            .bind(contest_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(ids.into_iter().collect())
    }

    async fn list_user_submissions(
        &self,
        user_id: i64,
        contest_id: i64,
    ) -> Result<Vec<Submission>, RepositoryError> {
        let submissions = sqlx::query_as::<_, Submission>(
            r#"
            SELECT
                s.id, s.user_id, s.question_id, s.answer, s.similarity,
                s.is_correct, s.time_taken_ms, s.submitted_at
            FROM submissions s
            JOIN questions q ON q.id = s.question_id
            WHERE s.user_id = $1 AND q.contest_id = $2
            ORDER BY s.submitted_at ASC, s.id ASC
            "#,
        )
        .bind(user_id)
        .bind(contest_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(submissions)
    }

    async fn insert_submission(
        &self,
        record: NewSubmission,
    ) -> Result<Submission, RepositoryError> {
        let submission = sqlx::query_as::<_, Submission>(
            r#"
            INSERT INTO submissions
                (user_id, question_id, answer, similarity, is_correct, time_taken_ms, submitted_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING
                id, user_id, question_id, answer, similarity,
                is_correct, time_taken_ms, submitted_at
            "#,
        )
        .bind(record.user_id)
        .bind(record.question_id)
        .bind(&record.answer)
        .bind(record.similarity)
        .bind(record.is_correct)
        .bind(record.time_taken_ms)
        .bind(record.submitted_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(submission)
    }

    async fn insert_aggregate_result(
        &self,
        record: NewContestResult,
    ) -> Result<ContestResult, RepositoryError> {
        let result = sqlx::query_as::<_, ContestResult>(
            r#"
            INSERT INTO contest_results (user_id, contest_id, number_of_correct_answers, time_ms)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, contest_id, number_of_correct_answers, time_ms, created_at
            "#,
        )
        .bind(record.user_id)
        .bind(record.contest_id)
        .bind(record.number_of_correct_answers)
        .bind(record.time_ms)
        .fetch_one(&self.pool)
        .await?;

        Ok(result)
    }

    async fn get_aggregate_result(
        &self,
        user_id: i64,
        contest_id: i64,
    ) -> Result<Option<ContestResult>, RepositoryError> {
        let result = sqlx::query_as::<_, ContestResult>(
            r#"
            SELECT id, user_id, contest_id, number_of_correct_answers, time_ms, created_at
            FROM contest_results
            WHERE user_id = $1 AND contest_id = $2
            "#,
        )
        .bind(user_id)
        .bind(contest_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(result)
    }
}
