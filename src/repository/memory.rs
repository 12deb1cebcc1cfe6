// src/repository/memory.rs

use std::{
    collections::{BTreeSet, HashMap},
    sync::RwLock,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{QuizRepository, RepositoryError};
use crate::models::{
    question::Question,
    result::{ContestResult, NewContestResult},
    submission::{NewSubmission, Submission},
};

/// In-process `QuizRepository` with the same uniqueness rules as the schema.
/// Used by tests and by the engine-level integration suite.
#[derive(Default)]
pub struct MemoryQuizRepository {
    state: RwLock<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    questions: HashMap<i64, Question>,
    references: HashMap<i64, Vec<f32>>,
    first_views: HashMap<(i64, i64), DateTime<Utc>>,
    submissions: Vec<Submission>,
    results: HashMap<(i64, i64), ContestResult>,
    next_id: i64,
}

impl MemoryState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

fn poisoned() -> RepositoryError {
    RepositoryError::Database("lock poisoned".to_string())
}

impl MemoryQuizRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a question, optionally with its reference-answer embedding.
    pub fn add_question(&self, question: Question, reference: Option<Vec<f32>>) {
        if let Ok(mut state) = self.state.write() {
            if let Some(vector) = reference {
                state.references.insert(question.id, vector);
            }
            state.questions.insert(question.id, question);
        }
    }

    pub fn submission_count(&self) -> usize {
        self.state.read().map(|s| s.submissions.len()).unwrap_or(0)
    }

    pub fn result_count(&self) -> usize {
        self.state.read().map(|s| s.results.len()).unwrap_or(0)
    }
}

#[async_trait]
impl QuizRepository for MemoryQuizRepository {
    async fn get_question(&self, question_id: i64) -> Result<Option<Question>, RepositoryError> {
        let state = self.state.read().map_err(|_| poisoned())?;
        Ok(state.questions.get(&question_id).cloned())
    }

    async fn get_reference_embedding(
        &self,
        question_id: i64,
    ) -> Result<Option<Vec<f32>>, RepositoryError> {
        let state = self.state.read().map_err(|_| poisoned())?;
        Ok(state.references.get(&question_id).cloned())
    }

    async fn get_first_view(
        &self,
        user_id: i64,
        question_id: i64,
    ) -> Result<Option<DateTime<Utc>>, RepositoryError> {
        let state = self.state.read().map_err(|_| poisoned())?;
        Ok(state.first_views.get(&(user_id, question_id)).copied())
    }

    async fn record_question_view(
        &self,
        user_id: i64,
        question_id: i64,
        viewed_at: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, RepositoryError> {
        let mut state = self.state.write().map_err(|_| poisoned())?;
        Ok(*state
            .first_views
            .entry((user_id, question_id))
            .or_insert(viewed_at))
    }

    async fn list_question_ids(&self, contest_id: i64) -> Result<BTreeSet<i64>, RepositoryError> {
        let state = self.state.read().map_err(|_| poisoned())?;
        Ok(state
            .questions
            .values()
            .filter(|q| q.contest_id == contest_id)
            .map(|q| q.id)
            .collect())
    }

    async fn list_user_submissions(
        &self,
        user_id: i64,
        contest_id: i64,
    ) -> Result<Vec<Submission>, RepositoryError> {
        let state = self.state.read().map_err(|_| poisoned())?;
        Ok(state
            .submissions
            .iter()
            .filter(|s| s.user_id == user_id)
            .filter(|s| {
                state
                    .questions
                    .get(&s.question_id)
                    .is_some_and(|q| q.contest_id == contest_id)
            })
            .cloned()
            .collect())
    }

    async fn insert_submission(
        &self,
        record: NewSubmission,
    ) -> Result<Submission, RepositoryError> {
        let mut state = self.state.write().map_err(|_| poisoned())?;
        let submission = Submission {
            id: state.next_id(),
            user_id: record.user_id,
            question_id: record.question_id,
            answer: record.answer,
            similarity: record.similarity,
            is_correct: record.is_correct,
            time_taken_ms: record.time_taken_ms,
            submitted_at: record.submitted_at,
        };
        state.submissions.push(submission.clone());
        Ok(submission)
    }

    async fn insert_aggregate_result(
        &self,
        record: NewContestResult,
    ) -> Result<ContestResult, RepositoryError> {
        let mut state = self.state.write().map_err(|_| poisoned())?;
        let key = (record.user_id, record.contest_id);
        if state.results.contains_key(&key) {
            return Err(RepositoryError::UniqueViolation(
                "uq_user_contest_result".to_string(),
            ));
        }

        let result = ContestResult {
            id: state.next_id(),
            user_id: record.user_id,
            contest_id: record.contest_id,
            number_of_correct_answers: record.number_of_correct_answers,
            time_ms: record.time_ms,
            created_at: Utc::now(),
        };
        state.results.insert(key, result.clone());
        Ok(result)
    }

    async fn get_aggregate_result(
        &self,
        user_id: i64,
        contest_id: i64,
    ) -> Result<Option<ContestResult>, RepositoryError> {
        let state = self.state.read().map_err(|_| poisoned())?;
        Ok(state.results.get(&(user_id, contest_id)).cloned())
    }
}
