pub mod auth;
pub mod cases;
pub mod chat;
pub mod error;
pub mod models;

use axum::{Router, extract::FromRef, routing::get};
use sqlx::SqlitePool;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use error::{AppError, AppResult};

#[derive(Clone, FromRef)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub auth_keys: auth::AuthKeys,
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(health))
        .nest("/api/auth", auth::router())
        .nest("/api/cases", cases::router())
        .nest("/api/messages", chat::router())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

async fn health() -> &'static str {
    "PathoLink backend is running"
}
