// src/routes.rs

use axum::{
    Router,
    http::{HeaderName, Method, header},
    middleware,
    routing::{get, post, put},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    handlers::{admin, auth, contest, question},
    state::AppState,
    utils::{
        api_key::{API_KEY_HEADER, api_key_middleware},
        jwt::{admin_middleware, auth_middleware},
    },
};

/// Assembles the main application router.
///
/// * Participant routes authenticate with the `x-api-key` header.
/// * Organizer routes require a Bearer JWT with the admin role.
/// * Applies global middleware (Trace, CORS).
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static(API_KEY_HEADER),
        ]);

    let auth_routes = Router::new()
        .route("/signup", post(auth::signup))
        .route("/login", post(auth::login));

    let participant_routes = Router::new()
        .route("/contests", get(contest::list_contests))
        .route("/contests/{id}", get(contest::get_contest))
        .route("/contests/{id}/questions", get(contest::list_contest_questions))
        .route(
            "/questions/{id}",
            get(question::get_question).post(question::submit_answer),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api_key_middleware,
        ));

    let public_routes =
        Router::new().route("/contests/{id}/ranking", get(contest::get_ranking));

    let admin_routes = Router::new()
        .route("/contests", post(admin::register_contest))
        .route("/contests/{id}/status", put(admin::update_contest_status))
        .route("/contests/{id}/results", get(admin::get_results))
        // Auth first, then Admin check
        .layer(middleware::from_fn(admin_middleware))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let api_routes = Router::new()
        .nest("/auth", auth_routes)
        .nest("/admin", admin_routes)
        .merge(participant_routes)
        .merge(public_routes);

    Router::new()
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
