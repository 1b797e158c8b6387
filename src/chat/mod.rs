//! Case-scoped messaging: send, thread listing, and the aggregated inbox.

pub mod inbox;
pub mod policy;
pub mod service;
pub mod store;

use axum::{
    Json, Router, debug_handler,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::auth::AuthUser;
use crate::models::{MessageRow, UserBrief};
use crate::{AppResult, AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(send))
        .route("/inbox", get(get_inbox))
        .route("/{case_id}", get(get_thread))
}

/// Message as it goes over the wire, optionally carrying denormalized
/// sender/receiver info.
#[derive(Debug, Serialize)]
pub struct MessageOut {
    pub id: String,
    pub message_text: String,
    pub is_read: bool,
    pub created_at: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub case_id: String,
    #[serde(rename = "Sender", skip_serializing_if = "Option::is_none")]
    pub sender: Option<UserBrief>,
    #[serde(rename = "Receiver", skip_serializing_if = "Option::is_none")]
    pub receiver: Option<UserBrief>,
}

impl MessageOut {
    fn from_row(row: MessageRow, sender: Option<UserBrief>, receiver: Option<UserBrief>) -> Self {
        MessageOut {
            id: row.id,
            message_text: row.message_text,
            is_read: row.is_read,
            created_at: row.created_at,
            sender_id: row.sender_id,
            receiver_id: row.receiver_id,
            case_id: row.case_id,
            sender,
            receiver,
        }
    }
}

/// One inbox entry: the case, the counterpart, the most recent message and
/// the unread tally.
#[derive(Debug, Serialize)]
pub struct ConversationOut {
    pub case_id: String,
    pub case_title: String,
    pub case_image: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub case_prediction: Option<String>,
    pub other_user: UserBrief,
    pub last_message: MessageOut,
    pub last_message_time: String,
    pub unread_count: i64,
}

#[derive(Deserialize)]
struct SendMessageRequest {
    case_id: String,
    receiver_id: String,
    message_text: String,
}

#[debug_handler(state = AppState)]
async fn send(
    State(db_pool): State<SqlitePool>,
    auth: AuthUser,
    Json(req): Json<SendMessageRequest>,
) -> AppResult<Response> {
    let msg = service::send_message(
        &db_pool,
        &auth.id,
        &req.case_id,
        &req.receiver_id,
        &req.message_text,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(msg)).into_response())
}

#[debug_handler(state = AppState)]
async fn get_thread(
    State(db_pool): State<SqlitePool>,
    auth: AuthUser,
    Path(case_id): Path<String>,
) -> AppResult<Json<Vec<MessageOut>>> {
    let msgs = service::list_thread(&db_pool, &auth.id, auth.role, &case_id).await?;
    Ok(Json(msgs))
}

#[debug_handler(state = AppState)]
async fn get_inbox(
    State(db_pool): State<SqlitePool>,
    auth: AuthUser,
) -> AppResult<Json<Vec<ConversationOut>>> {
    let inbox = service::list_inbox(&db_pool, &auth.id).await?;
    Ok(Json(inbox))
}
