use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use crate::models::membership::MemberRole;

/// A project member joined with the public bits of their account.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct MemberView {
    pub user_id: Uuid,
    pub username: String,
    pub profile_picture: Option<String>,
    pub tech_stack: Option<String>,
    pub role: String,
    pub joined_at: DateTime<Utc>,
}

/// Adds `user_id` to the project. Existing memberships are left untouched.
/// Returns whether a row was inserted.
pub async fn add_member(
    conn: &mut PgConnection,
    project_id: Uuid,
    user_id: Uuid,
    role: MemberRole,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO project_memberships (id, user_id, project_id, role)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (user_id, project_id) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(project_id)
    .bind(role.as_str())
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn is_member(pool: &PgPool, project_id: Uuid, user_id: Uuid) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM project_memberships WHERE project_id = $1 AND user_id = $2)",
    )
    .bind(project_id)
    .bind(user_id)
    .fetch_one(pool)
    .await
}

pub async fn count_memberships(pool: &PgPool, user_id: Uuid) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM project_memberships WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await
}

pub async fn member_ids(pool: &PgPool, project_id: Uuid) -> Result<Vec<Uuid>, sqlx::Error> {
    sqlx::query_scalar("SELECT user_id FROM project_memberships WHERE project_id = $1")
        .bind(project_id)
        .fetch_all(pool)
        .await
}

pub async fn project_members(
    pool: &PgPool,
    project_id: Uuid,
) -> Result<Vec<MemberView>, sqlx::Error> {
    sqlx::query_as::<_, MemberView>(
        r#"
        SELECT u.id AS user_id, u.username, u.profile_picture, u.tech_stack, m.role, m.joined_at
        FROM project_memberships m
        JOIN users u ON u.id = m.user_id
        WHERE m.project_id = $1
        ORDER BY m.joined_at ASC
        "#,
    )
    .bind(project_id)
    .fetch_all(pool)
    .await
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct MembershipSummary {
    pub project_id: Uuid,
    pub project_title: String,
    pub role: String,
    pub joined_at: DateTime<Utc>,
}

/// A user's memberships, newest first, with project titles.
pub async fn memberships_for_user(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Vec<MembershipSummary>, sqlx::Error> {
    sqlx::query_as::<_, MembershipSummary>(
        r#"
        SELECT m.project_id, p.title AS project_title, m.role, m.joined_at
        FROM project_memberships m
        JOIN projects p ON p.id = m.project_id
        WHERE m.user_id = $1
        ORDER BY m.joined_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}
