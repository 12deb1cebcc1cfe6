// src/handlers/contest.rs

use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use sqlx::PgPool;

use crate::{
    error::AppError,
    models::{
        contest::{Contest, ContestResponse, ContestStatus, DataSource, DataSourcePayload},
        question::{PublicQuestion, Question},
        result::RankingEntry,
        user::AuthUser,
    },
    utils::time::format_millis,
};

async fn fetch_contest(pool: &PgPool, contest_id: i64) -> Result<Contest, AppError> {
    sqlx::query_as::<_, Contest>(
        r#"
        SELECT id, name, number_of_questions, description, status, start_at, end_at, created_at
        FROM contests
        WHERE id = $1
        "#,
    )
    .bind(contest_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Contest not found".to_string()))
}

/// Option texts per question, in authoring order.
pub(crate) async fn fetch_options(
    pool: &PgPool,
    question_ids: &[i64],
) -> Result<HashMap<i64, Vec<String>>, AppError> {
    let rows = sqlx::query_as::<_, (i64, String)>(
        r#"
        SELECT question_id, option_text
        FROM answer_options
        WHERE question_id = ANY($1)
        ORDER BY question_id, position
        "#,
    )
    .bind(question_ids)
    .fetch_all(pool)
    .await?;

    let mut options: HashMap<i64, Vec<String>> = HashMap::new();
    for (question_id, text) in rows {
        options.entry(question_id).or_default().push(text);
    }
    Ok(options)
}

/// Lists the ids of contests that are not finished.
pub async fn list_contests(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let ids: Vec<i64> =
        sqlx::query_scalar("SELECT id FROM contests WHERE status <> $1 ORDER BY id")
            .bind(ContestStatus::Done.as_str())
            .fetch_all(&pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to list contests: {:?}", e);
                AppError::InternalServerError(e.to_string())
            })?;

    Ok(Json(ids))
}

/// Returns a contest with its question ids and data sources.
///
/// Records the participant's first download of the contest; later
/// downloads keep the original timestamp.
pub async fn get_contest(
    State(pool): State<PgPool>,
    Extension(user): Extension<AuthUser>,
    Path(contest_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let contest = fetch_contest(&pool, contest_id).await?;

    let questions: Vec<i64> =
        sqlx::query_scalar("SELECT id FROM questions WHERE contest_id = $1 ORDER BY id")
            .bind(contest_id)
            .fetch_all(&pool)
            .await?;

    let data_sources = sqlx::query_as::<_, DataSource>(
        r#"
        SELECT id, contest_id, path, type, description
        FROM data_sources
        WHERE contest_id = $1
        ORDER BY id
        "#,
    )
    .bind(contest_id)
    .fetch_all(&pool)
    .await?;

    if let Err(e) = sqlx::query(
        r#"
        INSERT INTO contest_first_views (user_id, contest_id)
        VALUES ($1, $2)
        ON CONFLICT (user_id, contest_id) DO NOTHING
        "#,
    )
    .bind(user.id)
    .bind(contest_id)
    .execute(&pool)
    .await
    {
        tracing::warn!(
            "Failed to record contest view for user {} contest {}: {:?}",
            user.id,
            contest_id,
            e
        );
    }

    Ok(Json(ContestResponse {
        id: contest.id,
        name: contest.name,
        status: contest.status,
        questions,
        description: contest.description,
        start_at: contest.start_at,
        end_at: contest.end_at,
        data_sources: data_sources
            .into_iter()
            .map(DataSourcePayload::from)
            .collect(),
    }))
}

/// Lists every question of a contest.
///
/// Does not start the answer clock; only fetching a single question does.
pub async fn list_contest_questions(
    State(pool): State<PgPool>,
    Path(contest_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    fetch_contest(&pool, contest_id).await?;

    let questions = sqlx::query_as::<_, Question>(
        r#"
        SELECT id, contest_id, query, number_of_options, description
        FROM questions
        WHERE contest_id = $1
        ORDER BY id
        "#,
    )
    .bind(contest_id)
    .fetch_all(&pool)
    .await?;

    let ids: Vec<i64> = questions.iter().map(|q| q.id).collect();
    let mut options = fetch_options(&pool, &ids).await?;

    let public: Vec<PublicQuestion> = questions
        .into_iter()
        .map(|q| {
            let opts = options.remove(&q.id).unwrap_or_default();
            PublicQuestion::new(q, opts)
        })
        .collect();

    Ok(Json(public))
}

/// Ranking of a contest: most correct answers first, then fastest.
pub async fn get_ranking(
    State(pool): State<PgPool>,
    Path(contest_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    fetch_contest(&pool, contest_id).await?;

    let mut ranking = sqlx::query_as::<_, RankingEntry>(
        r#"
        SELECT
            RANK() OVER (ORDER BY r.number_of_correct_answers DESC, r.time_ms ASC) AS rank,
            u.username,
            r.number_of_correct_answers,
            r.time_ms
        FROM contest_results r
        JOIN users u ON r.user_id = u.id
        WHERE r.contest_id = $1
        ORDER BY r.number_of_correct_answers DESC, r.time_ms ASC, r.created_at ASC
        "#,
    )
    .bind(contest_id)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch ranking: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    for entry in &mut ranking {
        entry.time = format_millis(entry.time_ms);
    }

    Ok(Json(ranking))
}
