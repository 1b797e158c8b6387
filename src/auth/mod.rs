mod password;
mod profile;
pub mod token;

use axum::{
    Json, Router, debug_handler,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

pub use token::{AuthKeys, AuthUser};

use crate::models::{Role, UserRow, now_iso};
use crate::{AppError, AppResult, AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/patients", get(profile::patients))
        .route("/doctors", get(profile::doctors))
        .route(
            "/profile",
            get(profile::get_profile).put(profile::update_profile),
        )
        .route("/change-password", put(profile::change_password))
}

#[derive(Deserialize)]
struct RegisterRequest {
    name: String,
    email: String,
    password: String,
    role: Role,
}

#[derive(Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Serialize)]
struct AuthUserOut {
    id: String,
    name: String,
    email: String,
    role: Role,
}

#[derive(Serialize)]
struct AuthResponse {
    token: String,
    user: AuthUserOut,
}

#[debug_handler(state = AppState)]
async fn register(
    State(db_pool): State<SqlitePool>,
    State(keys): State<AuthKeys>,
    Json(req): Json<RegisterRequest>,
) -> AppResult<Response> {
    if req.name.trim().is_empty() || req.email.trim().is_empty() || req.password.is_empty() {
        return Err(AppError::InvalidArgument(
            "Name, email and password are required".to_owned(),
        ));
    }

    let existing = sqlx::query_as::<_, (String,)>("SELECT id FROM users WHERE email=?")
        .bind(&req.email)
        .fetch_optional(&db_pool)
        .await?;
    if existing.is_some() {
        return Err(AppError::Conflict("User already exists".to_owned()));
    }

    let id = Uuid::now_v7().to_string();
    let password_hash = password::hash_password(&req.password)?;
    sqlx::query(
        "INSERT INTO users (id,name,email,password_hash,role,created_at) VALUES (?,?,?,?,?,?)",
    )
    .bind(&id)
    .bind(&req.name)
    .bind(&req.email)
    .bind(&password_hash)
    .bind(req.role)
    .bind(now_iso()?)
    .execute(&db_pool)
    .await?;

    tracing::info!(user_id = %id, role = ?req.role, "registered user");

    let token = keys.issue(&id, req.role)?;
    let body = AuthResponse {
        token,
        user: AuthUserOut {
            id,
            name: req.name,
            email: req.email,
            role: req.role,
        },
    };
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

#[debug_handler(state = AppState)]
async fn login(
    State(db_pool): State<SqlitePool>,
    State(keys): State<AuthKeys>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let bad_credentials = || AppError::Unauthorized("Invalid credentials".to_owned());

    let user = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE email=?")
        .bind(&req.email)
        .fetch_optional(&db_pool)
        .await?
        .ok_or_else(bad_credentials)?;

    if !password::verify_password(&req.password, &user.password_hash)? {
        return Err(bad_credentials());
    }

    let token = keys.issue(&user.id, user.role)?;
    Ok(Json(AuthResponse {
        token,
        user: AuthUserOut {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
        },
    }))
}
