use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use crate::models::application::{ApplicationRow, RequestStatus};

/// An application with the project and applicant names attached.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ApplicationDetail {
    pub id: Uuid,
    pub project_id: Uuid,
    pub project_title: String,
    pub applicant_id: Uuid,
    pub applicant_username: String,
    pub status: String,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
}

const DETAIL_SELECT: &str = r#"
    SELECT a.id, a.project_id, p.title AS project_title, a.applicant_id,
           u.username AS applicant_username, a.status, a.message, a.created_at
    FROM applications a
    JOIN projects p ON p.id = a.project_id
    JOIN users u ON u.id = a.applicant_id
"#;

pub async fn has_applied(
    pool: &PgPool,
    project_id: Uuid,
    applicant_id: Uuid,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM applications WHERE project_id = $1 AND applicant_id = $2)",
    )
    .bind(project_id)
    .bind(applicant_id)
    .fetch_one(pool)
    .await
}

pub async fn insert_application(
    pool: &PgPool,
    project_id: Uuid,
    applicant_id: Uuid,
    message: Option<&str>,
) -> Result<ApplicationRow, sqlx::Error> {
    sqlx::query_as::<_, ApplicationRow>(
        r#"
        INSERT INTO applications (id, project_id, applicant_id, status, message)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(project_id)
    .bind(applicant_id)
    .bind(RequestStatus::Pending.as_str())
    .bind(message)
    .fetch_one(pool)
    .await
}

pub async fn find_application_detail(
    pool: &PgPool,
    id: Uuid,
) -> Result<Option<ApplicationDetail>, sqlx::Error> {
    sqlx::query_as::<_, ApplicationDetail>(&format!("{DETAIL_SELECT} WHERE a.id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Moves a pending application to `status`. Returns `None` if it was no
/// longer pending.
pub async fn resolve_pending(
    conn: &mut PgConnection,
    id: Uuid,
    status: RequestStatus,
) -> Result<Option<ApplicationRow>, sqlx::Error> {
    sqlx::query_as::<_, ApplicationRow>(
        "UPDATE applications SET status = $2 WHERE id = $1 AND status = 'pending' RETURNING *",
    )
    .bind(id)
    .bind(status.as_str())
    .fetch_optional(conn)
    .await
}

pub async fn applications_by_applicant(
    pool: &PgPool,
    applicant_id: Uuid,
) -> Result<Vec<ApplicationDetail>, sqlx::Error> {
    sqlx::query_as::<_, ApplicationDetail>(&format!(
        "{DETAIL_SELECT} WHERE a.applicant_id = $1 ORDER BY a.created_at DESC"
    ))
    .bind(applicant_id)
    .fetch_all(pool)
    .await
}

/// One page of applications to projects created by `creator_id`, newest first.
pub async fn applications_to_creator(
    pool: &PgPool,
    creator_id: Uuid,
    limit: i64,
    offset: i64,
) -> Result<Vec<ApplicationDetail>, sqlx::Error> {
    sqlx::query_as::<_, ApplicationDetail>(&format!(
        "{DETAIL_SELECT} WHERE p.creator_id = $1 ORDER BY a.created_at DESC LIMIT $2 OFFSET $3"
    ))
    .bind(creator_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
}

pub async fn pending_for_project(
    pool: &PgPool,
    project_id: Uuid,
) -> Result<Vec<ApplicationDetail>, sqlx::Error> {
    sqlx::query_as::<_, ApplicationDetail>(&format!(
        "{DETAIL_SELECT} WHERE a.project_id = $1 AND a.status = 'pending' ORDER BY a.created_at DESC"
    ))
    .bind(project_id)
    .fetch_all(pool)
    .await
}

/// Applications to `creator_id`'s projects, optionally only those in `status`.
pub async fn count_to_creator(
    pool: &PgPool,
    creator_id: Uuid,
    status: Option<RequestStatus>,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM applications a
        JOIN projects p ON p.id = a.project_id
        WHERE p.creator_id = $1 AND ($2::text IS NULL OR a.status = $2)
        "#,
    )
    .bind(creator_id)
    .bind(status.map(RequestStatus::as_str))
    .fetch_one(pool)
    .await
}

pub async fn count_by_applicant(pool: &PgPool, applicant_id: Uuid) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM applications WHERE applicant_id = $1")
        .bind(applicant_id)
        .fetch_one(pool)
        .await
}
