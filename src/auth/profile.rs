use axum::{Json, debug_handler, extract::State};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use super::password;
use super::token::AuthUser;
use crate::models::{Role, UserRow};
use crate::{AppError, AppResult, AppState};

#[derive(Serialize, sqlx::FromRow)]
pub(crate) struct PatientEntry {
    id: String,
    name: String,
    email: String,
}

#[derive(Serialize, sqlx::FromRow)]
pub(crate) struct DoctorEntry {
    id: String,
    name: String,
    email: String,
    profile_picture: Option<String>,
}

#[debug_handler(state = AppState)]
pub(crate) async fn patients(
    State(db_pool): State<SqlitePool>,
) -> AppResult<Json<Vec<PatientEntry>>> {
    let rows = sqlx::query_as::<_, PatientEntry>(
        "SELECT id,name,email FROM users WHERE role=? ORDER BY name",
    )
    .bind(Role::Patient)
    .fetch_all(&db_pool)
    .await?;
    Ok(Json(rows))
}

#[debug_handler(state = AppState)]
pub(crate) async fn doctors(
    State(db_pool): State<SqlitePool>,
    _auth: AuthUser,
) -> AppResult<Json<Vec<DoctorEntry>>> {
    let rows = sqlx::query_as::<_, DoctorEntry>(
        "SELECT id,name,email,profile_picture FROM users WHERE role=? ORDER BY name",
    )
    .bind(Role::Pathologist)
    .fetch_all(&db_pool)
    .await?;
    Ok(Json(rows))
}

#[derive(Serialize)]
pub(crate) struct ProfileOut {
    id: String,
    name: String,
    email: String,
    role: Role,
    phone_number: Option<String>,
    hospital_affiliation: Option<String>,
    license_id: Option<String>,
    profile_picture: Option<String>,
}

impl From<UserRow> for ProfileOut {
    fn from(u: UserRow) -> Self {
        ProfileOut {
            id: u.id,
            name: u.name,
            email: u.email,
            role: u.role,
            phone_number: u.phone_number,
            hospital_affiliation: u.hospital_affiliation,
            license_id: u.license_id,
            profile_picture: u.profile_picture,
        }
    }
}

async fn load_user(db_pool: &SqlitePool, user_id: &str) -> AppResult<UserRow> {
    sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id=?")
        .bind(user_id)
        .fetch_optional(db_pool)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_owned()))
}

#[debug_handler(state = AppState)]
pub(crate) async fn get_profile(
    State(db_pool): State<SqlitePool>,
    auth: AuthUser,
) -> AppResult<Json<ProfileOut>> {
    let user = load_user(&db_pool, &auth.id).await?;
    Ok(Json(user.into()))
}

#[derive(Deserialize)]
pub(crate) struct UpdateProfileRequest {
    name: Option<String>,
    phone_number: Option<String>,
    hospital_affiliation: Option<String>,
    license_id: Option<String>,
}

#[debug_handler(state = AppState)]
pub(crate) async fn update_profile(
    State(db_pool): State<SqlitePool>,
    auth: AuthUser,
    Json(req): Json<UpdateProfileRequest>,
) -> AppResult<Json<ProfileOut>> {
    let mut user = load_user(&db_pool, &auth.id).await?;

    if let Some(name) = req.name {
        user.name = name;
    }
    if let Some(phone) = req.phone_number {
        user.phone_number = Some(phone);
    }
    if let Some(affiliation) = req.hospital_affiliation {
        user.hospital_affiliation = Some(affiliation);
    }
    if let Some(license) = req.license_id {
        user.license_id = Some(license);
    }

    sqlx::query(
        "UPDATE users SET name=?, phone_number=?, hospital_affiliation=?, license_id=? WHERE id=?",
    )
    .bind(&user.name)
    .bind(&user.phone_number)
    .bind(&user.hospital_affiliation)
    .bind(&user.license_id)
    .bind(&user.id)
    .execute(&db_pool)
    .await?;

    Ok(Json(user.into()))
}

#[derive(Deserialize)]
pub(crate) struct ChangePasswordRequest {
    current_password: String,
    new_password: String,
}

#[debug_handler(state = AppState)]
pub(crate) async fn change_password(
    State(db_pool): State<SqlitePool>,
    auth: AuthUser,
    Json(req): Json<ChangePasswordRequest>,
) -> AppResult<Json<serde_json::Value>> {
    if req.current_password.is_empty() || req.new_password.is_empty() {
        return Err(AppError::InvalidArgument(
            "Current and new password are required".to_owned(),
        ));
    }

    let user = load_user(&db_pool, &auth.id).await?;
    if !password::verify_password(&req.current_password, &user.password_hash)? {
        return Err(AppError::InvalidArgument(
            "Current password is incorrect".to_owned(),
        ));
    }

    let password_hash = password::hash_password(&req.new_password)?;
    sqlx::query("UPDATE users SET password_hash=? WHERE id=?")
        .bind(&password_hash)
        .bind(&user.id)
        .execute(&db_pool)
        .await?;

    Ok(Json(
        serde_json::json!({ "message": "Password updated successfully" }),
    ))
}
