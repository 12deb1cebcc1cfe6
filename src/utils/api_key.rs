// src/utils/api_key.rs

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::Rng;
use sqlx::PgPool;

use crate::{error::AppError, models::user::AuthUser};

pub const API_KEY_HEADER: &str = "x-api-key";

/// Generates a URL-safe API key from 16 random bytes.
pub fn generate_api_key() -> String {
    let mut bytes = [0u8; 16];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Axum Middleware: API key authentication for contest participants.
///
/// Resolves the `x-api-key` header to a user and injects `AuthUser`
/// into the request extensions. Missing or unknown keys get 403.
pub async fn api_key_middleware(
    State(pool): State<PgPool>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let api_key = req
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| AppError::Forbidden("Invalid API Key".to_string()))?;

    let user = sqlx::query_as::<_, (i64, String)>(
        "SELECT id, username FROM users WHERE api_key = $1",
    )
    .bind(api_key)
    .fetch_optional(&pool)
    .await
    .map_err(|e| {
        tracing::error!("API key lookup failed: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?
    .ok_or_else(|| AppError::Forbidden("Invalid API Key".to_string()))?;

    req.extensions_mut().insert(AuthUser {
        id: user.0,
        username: user.1,
    });
    Ok(next.run(req).await)
}
