use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use time::{OffsetDateTime, format_description::BorrowedFormatItem, macros::format_description};

use crate::AppResult;

/// Fixed-width UTC timestamp format. Every generated timestamp has exactly
/// six subsecond digits, so lexicographic order on the stored TEXT column
/// agrees with chronological order.
pub const TS_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:6]Z");

pub fn now_iso() -> AppResult<String> {
    Ok(OffsetDateTime::now_utc()
        .format(&TS_FORMAT)
        .map_err(anyhow::Error::from)?)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(rename_all = "UPPERCASE")]
pub enum Role {
    Pathologist,
    Patient,
    Student,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub phone_number: Option<String>,
    pub hospital_affiliation: Option<String>,
    pub license_id: Option<String>,
    pub profile_picture: Option<String>,
    pub created_at: String,
}

/// Denormalized user info attached to messages and conversations.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct UserBrief {
    pub id: String,
    pub name: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<String>,
}

pub async fn user_brief(pool: &SqlitePool, user_id: &str) -> AppResult<Option<UserBrief>> {
    Ok(
        sqlx::query_as::<_, UserBrief>(
            "SELECT id,name,role,profile_picture FROM users WHERE id=?",
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await?,
    )
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CaseRow {
    pub id: String,
    pub title: String,
    pub image_url: String,
    pub ai_prediction: Option<String>,
    pub confidence_score: Option<f64>,
    pub doctor_notes: Option<String>,
    pub pathologist_id: String,
    pub patient_id: Option<String>,
    pub created_at: String,
}

/// A single entry in the append-only message log. Immutable after insert
/// except for `is_read`.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct MessageRow {
    pub id: String,
    pub case_id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub message_text: String,
    pub is_read: bool,
    pub created_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_are_fixed_width() {
        let a = now_iso().unwrap();
        let b = now_iso().unwrap();
        assert_eq!(a.len(), b.len());
        assert!(a.ends_with('Z'));
        assert!(a <= b);
    }

    #[test]
    fn role_serde_uses_screaming_names() {
        assert_eq!(serde_json::to_string(&Role::Pathologist).unwrap(), "\"PATHOLOGIST\"");
        let r: Role = serde_json::from_str("\"STUDENT\"").unwrap();
        assert_eq!(r, Role::Student);
    }
}
