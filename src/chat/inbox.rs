//! Conversation aggregator: folds a user's flat message log into one entry
//! per `(case, counterpart)` pair.

use std::collections::HashMap;

use crate::models::MessageRow;

/// One deduplicated conversation, before case metadata is attached.
#[derive(Debug, Clone)]
pub struct ConversationGroup {
    pub case_id: String,
    pub counterpart_id: String,
    pub last: MessageRow,
    pub unread_count: i64,
}

/// Pure fold of `messages` (the user's sent + received set) into inbox
/// groups. For each group the surfaced message is the maximum by
/// `(created_at, id)`, and the unread count covers the whole group, not
/// just the surfaced message.
///
/// Output is sorted most-recent-first; conversations whose last messages
/// share a timestamp are ordered by descending message id, then ascending
/// case id, so the result never depends on map iteration order.
pub fn fold_conversations(user_id: &str, messages: &[MessageRow]) -> Vec<ConversationGroup> {
    let mut groups: HashMap<(String, String), ConversationGroup> = HashMap::new();

    for m in messages {
        let counterpart = if m.sender_id == user_id {
            &m.receiver_id
        } else {
            &m.sender_id
        };

        let entry = groups
            .entry((m.case_id.clone(), counterpart.clone()))
            .or_insert_with(|| ConversationGroup {
                case_id: m.case_id.clone(),
                counterpart_id: counterpart.clone(),
                last: m.clone(),
                unread_count: 0,
            });

        // Timestamps are fixed-width, so string comparison is chronological.
        if (m.created_at.as_str(), m.id.as_str())
            > (entry.last.created_at.as_str(), entry.last.id.as_str())
        {
            entry.last = m.clone();
        }

        if m.receiver_id == user_id && !m.is_read {
            entry.unread_count += 1;
        }
    }

    let mut out: Vec<ConversationGroup> = groups.into_values().collect();
    out.sort_by(|a, b| {
        (b.last.created_at.as_str(), b.last.id.as_str())
            .cmp(&(a.last.created_at.as_str(), a.last.id.as_str()))
            .then_with(|| a.case_id.cmp(&b.case_id))
    });
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(
        id: &str,
        case_id: &str,
        sender: &str,
        receiver: &str,
        at: &str,
        is_read: bool,
    ) -> MessageRow {
        MessageRow {
            id: id.to_owned(),
            case_id: case_id.to_owned(),
            sender_id: sender.to_owned(),
            receiver_id: receiver.to_owned(),
            message_text: format!("msg {id}"),
            is_read,
            created_at: at.to_owned(),
        }
    }

    #[test]
    fn empty_log_gives_empty_inbox() {
        assert!(fold_conversations("me", &[]).is_empty());
    }

    #[test]
    fn one_group_per_case_counterpart_pair() {
        let log = vec![
            msg("m1", "c1", "me", "a", "2026-01-01T10:00:00.000000Z", false),
            msg("m2", "c1", "a", "me", "2026-01-01T10:01:00.000000Z", false),
            msg("m3", "c2", "me", "a", "2026-01-01T10:02:00.000000Z", false),
            msg("m4", "c1", "b", "me", "2026-01-01T10:03:00.000000Z", false),
        ];
        let inbox = fold_conversations("me", &log);
        // (c1,a), (c2,a), (c1,b)
        assert_eq!(inbox.len(), 3);
    }

    #[test]
    fn last_message_is_group_maximum() {
        let log = vec![
            msg("m1", "c1", "me", "a", "2026-01-01T10:00:00.000000Z", false),
            msg("m3", "c1", "me", "a", "2026-01-01T10:02:00.000000Z", false),
            msg("m2", "c1", "a", "me", "2026-01-01T10:01:00.000000Z", false),
        ];
        let inbox = fold_conversations("me", &log);
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].last.id, "m3");
    }

    #[test]
    fn colliding_timestamps_resolved_by_id() {
        let t = "2026-01-01T10:00:00.000000Z";
        let log = vec![
            msg("m2", "c1", "me", "a", t, false),
            msg("m1", "c1", "a", "me", t, false),
        ];
        let inbox = fold_conversations("me", &log);
        assert_eq!(inbox[0].last.id, "m2");

        // Same outcome regardless of input order.
        let reversed: Vec<_> = log.into_iter().rev().collect();
        let inbox = fold_conversations("me", &reversed);
        assert_eq!(inbox[0].last.id, "m2");
    }

    #[test]
    fn unread_counts_cover_the_whole_group() {
        let log = vec![
            msg("m1", "c1", "a", "me", "2026-01-01T10:00:00.000000Z", false),
            msg("m2", "c1", "a", "me", "2026-01-01T10:01:00.000000Z", false),
            msg("m3", "c1", "me", "a", "2026-01-01T10:02:00.000000Z", false),
            msg("m4", "c1", "a", "me", "2026-01-01T10:03:00.000000Z", true),
        ];
        let inbox = fold_conversations("me", &log);
        assert_eq!(inbox.len(), 1);
        // m1 and m2 are unread and addressed to me; m3 is mine (never counts
        // even though its is_read is false); m4 is already read.
        assert_eq!(inbox[0].unread_count, 2);
        assert_eq!(inbox[0].last.id, "m4");
    }

    #[test]
    fn inbox_sorted_most_recent_first() {
        let log = vec![
            msg("m1", "c1", "a", "me", "2026-01-01T10:00:00.000000Z", false),
            msg("m2", "c2", "b", "me", "2026-01-01T11:00:00.000000Z", false),
            msg("m3", "c3", "c", "me", "2026-01-01T09:00:00.000000Z", false),
        ];
        let inbox = fold_conversations("me", &log);
        let cases: Vec<&str> = inbox.iter().map(|g| g.case_id.as_str()).collect();
        assert_eq!(cases, ["c2", "c1", "c3"]);
    }

    #[test]
    fn new_message_moves_conversation_to_top() {
        let mut log = vec![
            msg("m1", "c1", "a", "me", "2026-01-01T10:00:00.000000Z", false),
            msg("m2", "c2", "b", "me", "2026-01-01T11:00:00.000000Z", false),
        ];
        let inbox = fold_conversations("me", &log);
        assert_eq!(inbox[0].case_id, "c2");

        log.push(msg("m3", "c1", "me", "a", "2026-01-01T12:00:00.000000Z", false));
        let inbox = fold_conversations("me", &log);
        assert_eq!(inbox[0].case_id, "c1");
        assert_eq!(inbox[0].last.id, "m3");
    }

    #[test]
    fn conversations_with_equal_recency_tie_break_on_case_id() {
        let t = "2026-01-01T10:00:00.000000Z";
        let log = vec![
            msg("m1", "c2", "a", "me", t, false),
            msg("m1", "c1", "b", "me", t, false),
        ];
        let inbox = fold_conversations("me", &log);
        assert_eq!(inbox[0].case_id, "c1");
        assert_eq!(inbox[1].case_id, "c2");
    }
}
