// src/handlers/admin.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use sqlx::PgPool;
use validator::Validate;

use crate::{
    embedding::{build_prompt, embed_with_timeout},
    error::AppError,
    grading::similarity::cosine_similarity,
    models::{
        contest::{ContestStatus, DataSourceType, RegisterContestRequest},
        result::ResultRow,
    },
    state::AppState,
    utils::{html::clean_description, time::format_millis},
};

/// Registers a contest with its data sources, questions and reference answers.
/// Admin only.
///
/// Reference-answer embeddings are computed up front with the same prompt
/// layout used for grading; nothing is written if any of them fails.
pub async fn register_contest(
    State(state): State<AppState>,
    Json(payload): Json<RegisterContestRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    if let Some(pos) = payload
        .query_answers
        .iter()
        .position(|qa| !qa.answer_matches_options())
    {
        return Err(AppError::BadRequest(format!(
            "Answer of question {} is not one of its options",
            pos + 1
        )));
    }

    let mut references = Vec::with_capacity(payload.query_answers.len());
    for (i, qa) in payload.query_answers.iter().enumerate() {
        let prompt = build_prompt(&state.config.embedding.task, &qa.query, &qa.answer);
        let vector =
            embed_with_timeout(state.embedder.as_ref(), &prompt, state.config.embedding.timeout)
                .await?;
        if let Err(e) = cosine_similarity(&vector, &vector) {
            tracing::error!("Reference answer {} produced an unusable embedding: {}", i + 1, e);
            return Err(AppError::BadRequest(format!(
                "Reference answer of question {} cannot be embedded",
                i + 1
            )));
        }
        references.push(vector);
    }

    let info = &payload.contest_info;
    let mut tx = state.pool.begin().await?;

    let contest_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO contests (name, number_of_questions, description, status, start_at, end_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id
        "#,
    )
    .bind(&info.name)
    .bind(payload.query_answers.len() as i32)
    .bind(clean_description(info.description.as_deref()))
    .bind(ContestStatus::Registered.as_str())
    .bind(info.start_at)
    .bind(info.end_at)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| match e.as_database_error() {
        Some(db_err) if db_err.is_unique_violation() => {
            AppError::Conflict(format!("Contest '{}' already exists", info.name))
        }
        _ => {
            tracing::error!("Failed to create contest: {:?}", e);
            AppError::from(e)
        }
    })?;

    for source in &payload.data_sources {
        sqlx::query(
            r#"
            INSERT INTO data_sources (contest_id, path, type, description)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(contest_id)
        .bind(&source.path)
        .bind(DataSourceType::parse(&source.source_type).as_str())
        .bind(clean_description(source.description.as_deref()))
        .execute(&mut *tx)
        .await?;
    }

    for (qa, vector) in payload.query_answers.iter().zip(references) {
        let question_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO questions (contest_id, query, number_of_options, description)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(contest_id)
        .bind(&qa.query)
        .bind(qa.options.len() as i32)
        .bind(clean_description(qa.description.as_deref()))
        .fetch_one(&mut *tx)
        .await?;

        for (position, option) in qa.options.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO answer_options (question_id, position, option_text)
                VALUES ($1, $2, $3)
                "#,
            )
            .bind(question_id)
            .bind(position as i32)
            .bind(option)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query(
            "INSERT INTO answer_embeddings (question_id, answer, embedding) VALUES ($1, $2, $3)",
        )
        .bind(question_id)
        .bind(&qa.answer)
        .bind(&vector)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    tracing::info!(
        "Registered contest '{}' ({}) with {} questions",
        info.name,
        contest_id,
        payload.query_answers.len()
    );

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "contest_id": contest_id,
            "number_of_questions": payload.query_answers.len(),
        })),
    ))
}

/// DTO for moving a contest through its lifecycle.
#[derive(Debug, Deserialize)]
pub struct UpdateContestStatusRequest {
    pub status: String,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
}

/// Updates a contest's status and schedule. Admin only.
pub async fn update_contest_status(
    State(pool): State<PgPool>,
    Path(contest_id): Path<i64>,
    Json(payload): Json<UpdateContestStatusRequest>,
) -> Result<impl IntoResponse, AppError> {
    let status: ContestStatus = payload.status.parse().map_err(AppError::BadRequest)?;

    sqlx::query_scalar::<_, i64>(
        r#"
        UPDATE contests
        SET status = $1,
            start_at = COALESCE($2, start_at),
            end_at = COALESCE($3, end_at)
        WHERE id = $4
        RETURNING id
        "#,
    )
    .bind(status.as_str())
    .bind(payload.start_at)
    .bind(payload.end_at)
    .bind(contest_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Contest not found".to_string()))?;

    Ok(Json(json!({ "id": contest_id, "status": status })))
}

/// Every submission of a contest with its verdict. Admin only.
pub async fn get_results(
    State(pool): State<PgPool>,
    Path(contest_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let rows = sqlx::query_as::<_, ResultRow>(
        r#"
        SELECT
            u.username AS user_name,
            q.query,
            s.answer,
            s.is_correct,
            s.similarity,
            s.time_taken_ms,
            s.submitted_at
        FROM submissions s
        JOIN questions q ON s.question_id = q.id
        JOIN users u ON s.user_id = u.id
        WHERE q.contest_id = $1
        ORDER BY s.submitted_at ASC, s.id ASC
        "#,
    )
    .bind(contest_id)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch contest results: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    let response: Vec<serde_json::Value> = rows
        .iter()
        .map(|row| {
            json!({
                "user_name": row.user_name,
                "query": row.query,
                "answer": row.answer,
                "pass_fail": row.pass_fail(),
                "similarity": row.similarity,
                "time": format_millis(row.time_taken_ms),
                "time_ms": row.time_taken_ms,
                "submitted_at": row.submitted_at,
            })
        })
        .collect();

    Ok(Json(response))
}
