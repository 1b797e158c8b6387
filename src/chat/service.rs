//! Messaging service: orchestrates access policy, the message store and the
//! inbox aggregator.

use std::collections::HashMap;

use sqlx::SqlitePool;

use super::inbox;
use super::policy;
use super::store::MessageStore;
use super::{ConversationOut, MessageOut};
use crate::AppResult;
use crate::models::{CaseRow, Role, UserBrief, user_brief};

/// Authorize and append one message. Fails before touching the store if the
/// sender is not a case participant or the receiver does not exist.
pub async fn send_message(
    pool: &SqlitePool,
    sender_id: &str,
    case_id: &str,
    receiver_id: &str,
    text: &str,
) -> AppResult<MessageOut> {
    let case = policy::load_participants(pool, case_id).await?;
    policy::check_send(&case, sender_id)?;
    policy::ensure_receiver(pool, receiver_id).await?;

    let store = MessageStore::new(pool.clone());
    let row = store.append(case_id, sender_id, receiver_id, text).await?;
    tracing::debug!(message_id = %row.id, case_id, "message appended");

    let sender = user_brief(pool, sender_id).await?;
    Ok(MessageOut::from_row(row, sender, None))
}

/// Return a case's thread in ascending order.
///
/// Reading is acknowledging: as a documented side effect, every unread
/// message addressed to the caller in this case flips to read, and the
/// returned list reflects the post-flip state.
pub async fn list_thread(
    pool: &SqlitePool,
    user_id: &str,
    role: Role,
    case_id: &str,
) -> AppResult<Vec<MessageOut>> {
    let case = policy::load_participants(pool, case_id).await?;
    policy::check_read(&case, user_id, role)?;

    let store = MessageStore::new(pool.clone());
    let mut rows = store.list_by_case(case_id).await?;

    let cleared = store.mark_read(case_id, user_id).await?;
    if cleared > 0 {
        tracing::debug!(case_id, user_id, cleared, "cleared unread messages");
    }
    for row in &mut rows {
        if row.receiver_id == user_id {
            row.is_read = true;
        }
    }

    let mut ids: Vec<&str> = Vec::with_capacity(rows.len() * 2);
    for r in &rows {
        ids.push(r.sender_id.as_str());
        ids.push(r.receiver_id.as_str());
    }
    let briefs = briefs_for(pool, ids).await?;

    Ok(rows
        .into_iter()
        .map(|row| {
            let sender = briefs.get(&row.sender_id).cloned();
            let receiver = briefs.get(&row.receiver_id).cloned();
            MessageOut::from_row(row, sender, receiver)
        })
        .collect())
}

/// Build the user's inbox: one conversation per `(case, counterpart)` pair,
/// most recent first, with case metadata denormalized at read time.
///
/// A group whose case or counterpart no longer resolves is skipped with a
/// warning rather than failing the whole fetch.
pub async fn list_inbox(pool: &SqlitePool, user_id: &str) -> AppResult<Vec<ConversationOut>> {
    let store = MessageStore::new(pool.clone());
    let rows = store.list_by_participant(user_id).await?;
    let groups = inbox::fold_conversations(user_id, &rows);

    let mut out = Vec::with_capacity(groups.len());
    for group in groups {
        let case = sqlx::query_as::<_, CaseRow>("SELECT * FROM cases WHERE id=?")
            .bind(&group.case_id)
            .fetch_optional(pool)
            .await?;
        let Some(case) = case else {
            tracing::warn!(case_id = %group.case_id, "skipping conversation for missing case");
            continue;
        };
        let Some(other_user) = user_brief(pool, &group.counterpart_id).await? else {
            tracing::warn!(user_id = %group.counterpart_id, "skipping conversation for missing counterpart");
            continue;
        };

        let sender = user_brief(pool, &group.last.sender_id).await?;
        let receiver = user_brief(pool, &group.last.receiver_id).await?;
        let last_message_time = group.last.created_at.clone();

        out.push(ConversationOut {
            case_id: case.id,
            case_title: case.title,
            case_image: case.image_url,
            case_prediction: case.ai_prediction,
            other_user,
            last_message: MessageOut::from_row(group.last, sender, receiver),
            last_message_time,
            unread_count: group.unread_count,
        });
    }
    Ok(out)
}

async fn briefs_for<'a>(
    pool: &SqlitePool,
    ids: impl IntoIterator<Item = &'a str>,
) -> AppResult<HashMap<String, UserBrief>> {
    let mut map = HashMap::new();
    for id in ids {
        if !map.contains_key(id) {
            if let Some(brief) = user_brief(pool, id).await? {
                map.insert(id.to_owned(), brief);
            }
        }
    }
    Ok(map)
}
