use std::{sync::Arc, time::Duration};

use axum::{Router, http::StatusCode};
use sqlx::SqlitePool;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    api::{self, ApiDoc},
    auth::TokenKeys,
    config::Config,
    quiz::attempt::QuizAttempts,
};

/// Shared state of every request handler
pub struct Server {
    pub database: SqlitePool,
    pub config: Config,
    pub tokens: TokenKeys,
    pub attempts: QuizAttempts,
}

impl Server {
    pub fn new(config: Config, database: SqlitePool) -> anyhow::Result<Self> {
        let secret = config.auth.resolve_secret()?;
        let tokens = TokenKeys::new(
            &secret,
            time::Duration::hours(config.auth.token_ttl_hours),
        );
        let attempts = QuizAttempts::new(config.quiz_time_limit());
        Ok(Self {
            database,
            config,
            tokens,
            attempts,
        })
    }
}

pub fn router(server: Arc<Server>) -> Router {
    let timeout = Duration::from_secs(server.config.request_timeout_secs);
    Router::new()
        .merge(api::routes())
        .with_state(server)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            timeout,
        ))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
