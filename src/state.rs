// src/state.rs

use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::PgPool;

use crate::{
    config::Config,
    embedding::EmbeddingClient,
    grading::GradingService,
    repository::{PgQuizRepository, QuizRepository},
};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub repo: Arc<dyn QuizRepository>,
    pub embedder: Arc<dyn EmbeddingClient>,
    pub grading: Arc<GradingService>,
}

impl AppState {
    /// Builds the state with the Postgres repository over `pool`.
    pub fn new(pool: PgPool, config: Config, embedder: Arc<dyn EmbeddingClient>) -> Self {
        let repo: Arc<dyn QuizRepository> = Arc::new(PgQuizRepository::new(pool.clone()));
        let grading = Arc::new(GradingService::new(
            repo.clone(),
            embedder.clone(),
            config.scoring(),
        ));

        Self {
            pool,
            config,
            repo,
            embedder,
            grading,
        }
    }
}

impl FromRef<AppState> for PgPool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
