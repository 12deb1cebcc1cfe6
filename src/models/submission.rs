// src/models/submission.rs

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'submissions' table in the database.
/// Rows are immutable once written.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Submission {
    pub id: i64,
    pub user_id: i64,
    pub question_id: i64,
    pub answer: String,
    pub similarity: f64,
    pub is_correct: bool,
    pub time_taken_ms: i64,
    pub submitted_at: DateTime<Utc>,
}

/// A graded answer ready to be persisted.
#[derive(Debug, Clone)]
pub struct NewSubmission {
    pub user_id: i64,
    pub question_id: i64,
    pub answer: String,
    pub similarity: f64,
    pub is_correct: bool,
    pub time_taken_ms: i64,
    pub submitted_at: DateTime<Utc>,
}

/// DTO for submitting an answer to a question.
#[derive(Debug, Deserialize, Validate)]
pub struct SubmitAnswerRequest {
    #[validate(length(min = 1, max = 5000, message = "Answer must not be empty."))]
    pub answer: String,
}

/// DTO returned after an answer has been graded.
#[derive(Debug, Serialize)]
pub struct SubmitAnswerResponse {
    pub question_id: i64,
    pub answer: String,
    pub is_correct: bool,
    pub similarity: f64,
    pub time_taken_ms: i64,
    pub not_answered_question_ids: BTreeSet<i64>,
    /// True once every question of the contest has been answered.
    pub is_all_submitted: bool,
}
