//! Access policy for case-scoped messaging: who may write to and read from
//! a case's thread.

use sqlx::SqlitePool;

use crate::models::Role;
use crate::{AppError, AppResult};

/// The participant set of a case: its pathologist and, if assigned, its
/// patient.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CaseParticipants {
    pub id: String,
    pub pathologist_id: String,
    pub patient_id: Option<String>,
}

impl CaseParticipants {
    pub fn is_participant(&self, user_id: &str) -> bool {
        self.pathologist_id == user_id || self.patient_id.as_deref() == Some(user_id)
    }
}

pub async fn load_participants(
    pool: &SqlitePool,
    case_id: &str,
) -> AppResult<CaseParticipants> {
    sqlx::query_as::<_, CaseParticipants>(
        "SELECT id,pathologist_id,patient_id FROM cases WHERE id=?",
    )
    .bind(case_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Case not found".to_owned()))
}

/// Only a case participant may send into its thread.
pub fn check_send(case: &CaseParticipants, sender_id: &str) -> AppResult<()> {
    if !case.is_participant(sender_id) {
        return Err(AppError::Forbidden(
            "You do not have access to this case".to_owned(),
        ));
    }
    Ok(())
}

/// The receiver only has to exist; it is deliberately not required to be a
/// case participant (a pathologist may message a colleague not yet tied to
/// the case).
pub async fn ensure_receiver(pool: &SqlitePool, receiver_id: &str) -> AppResult<()> {
    let found = sqlx::query_as::<_, (String,)>("SELECT id FROM users WHERE id=?")
        .bind(receiver_id)
        .fetch_optional(pool)
        .await?;
    if found.is_none() {
        return Err(AppError::NotFound("Receiver not found".to_owned()));
    }
    Ok(())
}

/// Participants may read their case's thread; students may read any thread.
pub fn check_read(case: &CaseParticipants, user_id: &str, role: Role) -> AppResult<()> {
    if !case.is_participant(user_id) && role != Role::Student {
        return Err(AppError::Forbidden(
            "You do not have access to this case".to_owned(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn case() -> CaseParticipants {
        CaseParticipants {
            id: "c1".into(),
            pathologist_id: "doc".into(),
            patient_id: Some("pat".into()),
        }
    }

    #[test]
    fn participants_may_send() {
        assert!(check_send(&case(), "doc").is_ok());
        assert!(check_send(&case(), "pat").is_ok());
    }

    #[test]
    fn outsiders_may_not_send() {
        assert!(matches!(
            check_send(&case(), "stranger"),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn case_without_patient_only_admits_pathologist() {
        let c = CaseParticipants {
            id: "c1".into(),
            pathologist_id: "doc".into(),
            patient_id: None,
        };
        assert!(c.is_participant("doc"));
        assert!(!c.is_participant("pat"));
    }

    #[test]
    fn students_may_read_any_case() {
        assert!(check_read(&case(), "stranger", Role::Student).is_ok());
    }

    #[test]
    fn non_student_outsiders_may_not_read() {
        assert!(matches!(
            check_read(&case(), "stranger", Role::Patient),
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            check_read(&case(), "stranger", Role::Pathologist),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn participants_may_read_regardless_of_role() {
        assert!(check_read(&case(), "doc", Role::Pathologist).is_ok());
        assert!(check_read(&case(), "pat", Role::Patient).is_ok());
    }
}
