// src/models/question.rs

use serde::Serialize;
use sqlx::prelude::FromRow;

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Question {
    pub id: i64,
    pub contest_id: i64,

    /// The text of the question shown to participants.
    pub query: String,

    /// 0 for free-text questions, otherwise the number of display options.
    pub number_of_options: i32,

    pub description: Option<String>,
}

impl Question {
    pub fn has_options(&self) -> bool {
        self.number_of_options > 0
    }
}

/// DTO for sending a question to participants (no reference answer).
#[derive(Debug, Serialize)]
pub struct PublicQuestion {
    pub id: i64,
    pub query: String,
    pub options: Vec<String>,
    pub description: Option<String>,
}

impl PublicQuestion {
    pub fn new(question: Question, options: Vec<String>) -> Self {
        Self {
            id: question.id,
            query: question.query,
            options,
            description: question.description,
        }
    }
}
