//! Durable append-only message log, keyed by case.

use sqlx::SqlitePool;
use uuid::Uuid;

use crate::models::{MessageRow, now_iso};
use crate::{AppError, AppResult};

/// Thin handle over the message table. Cloning is cheap (the pool is
/// Arc-backed).
#[derive(Clone)]
pub struct MessageStore {
    pool: SqlitePool,
}

impl MessageStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Append a message, assigning its id and timestamp. UUIDv7 ids are
    /// creation-ordered, so `(created_at, id)` is a strict total order even
    /// when two appends land on the same timestamp.
    pub async fn append(
        &self,
        case_id: &str,
        sender_id: &str,
        receiver_id: &str,
        text: &str,
    ) -> AppResult<MessageRow> {
        if text.trim().is_empty() {
            return Err(AppError::InvalidArgument(
                "Message text must not be empty".to_owned(),
            ));
        }

        let row = MessageRow {
            id: Uuid::now_v7().to_string(),
            case_id: case_id.to_owned(),
            sender_id: sender_id.to_owned(),
            receiver_id: receiver_id.to_owned(),
            message_text: text.to_owned(),
            is_read: false,
            created_at: now_iso()?,
        };

        sqlx::query(
            "INSERT INTO messages (id,case_id,sender_id,receiver_id,message_text,is_read,created_at)
             VALUES (?,?,?,?,?,?,?)",
        )
        .bind(&row.id)
        .bind(&row.case_id)
        .bind(&row.sender_id)
        .bind(&row.receiver_id)
        .bind(&row.message_text)
        .bind(row.is_read)
        .bind(&row.created_at)
        .execute(&self.pool)
        .await?;

        Ok(row)
    }

    /// All messages for a case, ascending `(created_at, id)`.
    pub async fn list_by_case(&self, case_id: &str) -> AppResult<Vec<MessageRow>> {
        Ok(sqlx::query_as::<_, MessageRow>(
            "SELECT * FROM messages WHERE case_id=? ORDER BY created_at ASC, id ASC",
        )
        .bind(case_id)
        .fetch_all(&self.pool)
        .await?)
    }

    /// All messages where the user is sender or receiver, across all cases,
    /// ascending. Feeds the inbox aggregator.
    pub async fn list_by_participant(&self, user_id: &str) -> AppResult<Vec<MessageRow>> {
        Ok(sqlx::query_as::<_, MessageRow>(
            "SELECT * FROM messages WHERE sender_id=? OR receiver_id=? ORDER BY created_at ASC, id ASC",
        )
        .bind(user_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?)
    }

    /// Flip every unread message addressed to `receiver_id` in this case to
    /// read. Only ever moves false -> true, so concurrent calls commute.
    /// Returns the number of rows updated; idempotent (a second call
    /// updates zero).
    pub async fn mark_read(&self, case_id: &str, receiver_id: &str) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE messages SET is_read=1 WHERE case_id=? AND receiver_id=? AND is_read=0",
        )
        .bind(case_id)
        .bind(receiver_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
