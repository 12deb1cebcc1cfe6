// src/handlers/question.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::Utc;
use validator::Validate;

use crate::{
    error::AppError,
    handlers::contest::fetch_options,
    models::{
        question::PublicQuestion,
        submission::{SubmitAnswerRequest, SubmitAnswerResponse},
        user::AuthUser,
    },
    state::AppState,
};

/// Returns one question and starts the participant's answer clock.
///
/// The first retrieval is recorded; elapsed time for grading is measured
/// from it, so later retrievals do not reset the clock.
pub async fn get_question(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(question_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let question = state
        .repo
        .get_question(question_id)
        .await?
        .ok_or(AppError::NotFound("Question not found".to_string()))?;

    let options = fetch_options(&state.pool, &[question.id])
        .await?
        .remove(&question.id)
        .unwrap_or_default();

    let first_view = state
        .repo
        .record_question_view(user.id, question.id, Utc::now())
        .await?;

    tracing::debug!(
        "User {} viewing question {} (first viewed at {})",
        user.id,
        question.id,
        first_view
    );

    Ok(Json(PublicQuestion::new(question, options)))
}

/// Grades a submitted answer.
///
/// * Scores the answer by embedding similarity against the reference answer.
/// * Stores the graded submission.
/// * Finalizes the contest result once every question has been answered.
pub async fn submit_answer(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(question_id): Path<i64>,
    Json(req): Json<SubmitAnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = req.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let outcome = state
        .grading
        .submit_answer(user.id, question_id, &req.answer)
        .await?;

    Ok(Json(SubmitAnswerResponse {
        question_id,
        answer: outcome.submission.answer,
        is_correct: outcome.submission.is_correct,
        similarity: outcome.submission.similarity,
        time_taken_ms: outcome.submission.time_taken_ms,
        is_all_submitted: outcome.finalize.finalized,
        not_answered_question_ids: outcome.remaining_question_ids,
    }))
}
