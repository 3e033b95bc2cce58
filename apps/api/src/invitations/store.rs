use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use crate::models::application::RequestStatus;
use crate::models::invitation::InvitationRow;

/// An invitation with project, sender and recipient names attached.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct InvitationDetail {
    pub id: Uuid,
    pub project_id: Uuid,
    pub project_title: String,
    pub sender_id: Uuid,
    pub sender_username: String,
    pub recipient_id: Uuid,
    pub recipient_username: String,
    pub status: String,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
}

const DETAIL_SELECT: &str = r#"
    SELECT i.id, i.project_id, p.title AS project_title,
           i.sender_id, s.username AS sender_username,
           i.recipient_id, r.username AS recipient_username,
           i.status, i.message, i.created_at
    FROM invitations i
    JOIN projects p ON p.id = i.project_id
    JOIN users s ON s.id = i.sender_id
    JOIN users r ON r.id = i.recipient_id
"#;

/// Which side of an invitation a listing is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Received,
    Sent,
}

impl Side {
    fn column(self) -> &'static str {
        match self {
            Side::Received => "i.recipient_id",
            Side::Sent => "i.sender_id",
        }
    }
}

pub async fn find_invitation(pool: &PgPool, id: Uuid) -> Result<Option<InvitationRow>, sqlx::Error> {
    sqlx::query_as::<_, InvitationRow>("SELECT * FROM invitations WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn find_for_recipient(
    pool: &PgPool,
    project_id: Uuid,
    recipient_id: Uuid,
) -> Result<Option<InvitationRow>, sqlx::Error> {
    sqlx::query_as::<_, InvitationRow>(
        "SELECT * FROM invitations WHERE project_id = $1 AND recipient_id = $2",
    )
    .bind(project_id)
    .bind(recipient_id)
    .fetch_optional(pool)
    .await
}

pub async fn insert_invitation(
    pool: &PgPool,
    project_id: Uuid,
    sender_id: Uuid,
    recipient_id: Uuid,
    message: Option<&str>,
) -> Result<InvitationRow, sqlx::Error> {
    sqlx::query_as::<_, InvitationRow>(
        r#"
        INSERT INTO invitations (id, project_id, sender_id, recipient_id, status, message)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(project_id)
    .bind(sender_id)
    .bind(recipient_id)
    .bind(RequestStatus::Pending.as_str())
    .bind(message)
    .fetch_one(pool)
    .await
}

/// Puts an answered invitation back to pending with a fresh message and timestamp.
pub async fn reopen_invitation(
    pool: &PgPool,
    id: Uuid,
    sender_id: Uuid,
    message: Option<&str>,
) -> Result<Option<InvitationRow>, sqlx::Error> {
    sqlx::query_as::<_, InvitationRow>(
        r#"
        UPDATE invitations
        SET status = 'pending', sender_id = $2, message = $3, created_at = now()
        WHERE id = $1 AND status <> 'pending'
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(sender_id)
    .bind(message)
    .fetch_optional(pool)
    .await
}

/// Moves a pending invitation to `status`. Returns `None` if it was no
/// longer pending.
pub async fn resolve_pending(
    conn: &mut PgConnection,
    id: Uuid,
    status: RequestStatus,
) -> Result<Option<InvitationRow>, sqlx::Error> {
    sqlx::query_as::<_, InvitationRow>(
        "UPDATE invitations SET status = $2 WHERE id = $1 AND status = 'pending' RETURNING *",
    )
    .bind(id)
    .bind(status.as_str())
    .fetch_optional(conn)
    .await
}

/// Deletes a pending invitation. Returns false if it was already answered.
pub async fn delete_pending(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM invitations WHERE id = $1 AND status = 'pending'")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn list_for(
    pool: &PgPool,
    side: Side,
    user_id: Uuid,
    limit: i64,
    offset: i64,
) -> Result<Vec<InvitationDetail>, sqlx::Error> {
    sqlx::query_as::<_, InvitationDetail>(&format!(
        "{DETAIL_SELECT} WHERE {} = $1 ORDER BY i.created_at DESC LIMIT $2 OFFSET $3",
        side.column()
    ))
    .bind(user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
}

pub async fn count_for(
    pool: &PgPool,
    side: Side,
    user_id: Uuid,
    status: Option<RequestStatus>,
) -> Result<i64, sqlx::Error> {
    let column = match side {
        Side::Received => "recipient_id",
        Side::Sent => "sender_id",
    };
    sqlx::query_scalar(&format!(
        "SELECT COUNT(*) FROM invitations WHERE {column} = $1 AND ($2::text IS NULL OR status = $2)"
    ))
    .bind(user_id)
    .bind(status.map(RequestStatus::as_str))
    .fetch_one(pool)
    .await
}

pub async fn pending_recipient_ids(
    pool: &PgPool,
    project_id: Uuid,
) -> Result<Vec<Uuid>, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT recipient_id FROM invitations WHERE project_id = $1 AND status = 'pending'",
    )
    .bind(project_id)
    .fetch_all(pool)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::Role;
    use crate::test_support;

    #[sqlx::test]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn test_answered_invitation_reopens_and_only_pending_deletes(pool: PgPool) {
        let leader = test_support::user(&pool, "lead", "lead@example.com", Role::Leader).await;
        let dev = test_support::user(&pool, "dev", "dev@example.com", Role::Applicant).await;
        let project = test_support::project(&pool, &leader, "Compiler").await;
        let invitation = insert_invitation(&pool, project.id, leader.id, dev.id, None)
            .await
            .unwrap();

        // Pending invitations are not reopened.
        assert!(reopen_invitation(&pool, invitation.id, leader.id, Some("again"))
            .await
            .unwrap()
            .is_none());

        let mut conn = pool.acquire().await.unwrap();
        let rejected = resolve_pending(&mut conn, invitation.id, RequestStatus::Rejected)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(rejected.status, "rejected");
        assert!(!delete_pending(&pool, invitation.id).await.unwrap());

        let reopened = reopen_invitation(&pool, invitation.id, leader.id, Some("again"))
            .await
            .unwrap()
            .unwrap();
        assert!(reopened.is_pending());
        assert_eq!(reopened.message.as_deref(), Some("again"));

        assert!(delete_pending(&pool, invitation.id).await.unwrap());
        assert!(find_invitation(&pool, invitation.id).await.unwrap().is_none());
    }
}
