// src/models/result.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// Represents the 'contest_results' table in the database.
/// At most one row per (user, contest).
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct ContestResult {
    pub id: i64,
    pub user_id: i64,
    pub contest_id: i64,
    pub number_of_correct_answers: i32,
    pub time_ms: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewContestResult {
    pub user_id: i64,
    pub contest_id: i64,
    pub number_of_correct_answers: i32,
    pub time_ms: i64,
}

/// Aggregated struct for displaying the ranking.
/// Represents a row joined from `users` and `contest_results`.
#[derive(Debug, Serialize, FromRow)]
pub struct RankingEntry {
    pub rank: i64,
    pub username: String,
    pub number_of_correct_answers: i32,
    pub time_ms: i64,
    /// `time_ms` as `HH:MM:SS.mmm`.
    #[sqlx(default)]
    pub time: String,
}

/// One submission line of a contest's results view.
#[derive(Debug, Serialize, FromRow)]
pub struct ResultRow {
    pub user_name: String,
    pub query: String,
    pub answer: String,
    pub is_correct: bool,
    pub similarity: f64,
    pub time_taken_ms: i64,
    pub submitted_at: DateTime<Utc>,
}

impl ResultRow {
    pub fn pass_fail(&self) -> &'static str {
        if self.is_correct { "Pass" } else { "Fail" }
    }
}
