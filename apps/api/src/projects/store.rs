use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::memberships::store::add_member;
use crate::models::group::group_name_for;
use crate::models::membership::MemberRole;
use crate::models::project::{ProjectRow, ProjectStatus};

pub struct NewProject<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub required_skills: Option<&'a str>,
    pub team_size: i32,
    pub duration: &'a str,
}

pub struct ProjectChanges<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub required_skills: Option<&'a str>,
    pub team_size: i32,
    pub duration: &'a str,
    pub status: ProjectStatus,
}

/// Inserts a project together with its group chat and the creator's admin
/// membership, in one transaction.
pub async fn create_project(
    pool: &PgPool,
    creator_id: Uuid,
    new: NewProject<'_>,
) -> Result<ProjectRow, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let project = sqlx::query_as::<_, ProjectRow>(
        r#"
        INSERT INTO projects (id, title, description, required_skills, team_size, duration, status, creator_id)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(new.title)
    .bind(new.description)
    .bind(new.required_skills)
    .bind(new.team_size)
    .bind(new.duration)
    .bind(ProjectStatus::Active.as_str())
    .bind(creator_id)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query("INSERT INTO groups (id, name, project_id) VALUES ($1, $2, $3)")
        .bind(Uuid::new_v4())
        .bind(group_name_for(&project.title))
        .bind(project.id)
        .execute(&mut *tx)
        .await?;

    add_member(&mut *tx, project.id, creator_id, MemberRole::Admin).await?;

    tx.commit().await?;
    info!("Created project {} ({}) for {creator_id}", project.title, project.id);
    Ok(project)
}

pub async fn find_project(pool: &PgPool, id: Uuid) -> Result<Option<ProjectRow>, sqlx::Error> {
    sqlx::query_as::<_, ProjectRow>("SELECT * FROM projects WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn update_project(
    pool: &PgPool,
    id: Uuid,
    changes: ProjectChanges<'_>,
) -> Result<ProjectRow, sqlx::Error> {
    sqlx::query_as::<_, ProjectRow>(
        r#"
        UPDATE projects
        SET title = $2, description = $3, required_skills = $4,
            team_size = $5, duration = $6, status = $7
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(changes.title)
    .bind(changes.description)
    .bind(changes.required_skills)
    .bind(changes.team_size)
    .bind(changes.duration)
    .bind(changes.status.as_str())
    .fetch_one(pool)
    .await
}

/// Projects matching the browse filters, newest first.
///
/// `status = None` means every status. `search` matches title, description or
/// required skills; every entry of `tech_patterns` must match required skills.
pub async fn search_projects(
    pool: &PgPool,
    status: Option<ProjectStatus>,
    search: Option<&str>,
    tech_patterns: &[String],
) -> Result<Vec<ProjectRow>, sqlx::Error> {
    sqlx::query_as::<_, ProjectRow>(
        r#"
        SELECT * FROM projects
        WHERE ($1::text IS NULL OR status = $1)
          AND ($2::text IS NULL OR title ILIKE $2 OR description ILIKE $2 OR required_skills ILIKE $2)
          AND required_skills ILIKE ALL($3)
        ORDER BY created_at DESC
        "#,
    )
    .bind(status.map(ProjectStatus::as_str))
    .bind(search)
    .bind(tech_patterns)
    .fetch_all(pool)
    .await
}

pub async fn projects_by_creator(
    pool: &PgPool,
    creator_id: Uuid,
) -> Result<Vec<ProjectRow>, sqlx::Error> {
    sqlx::query_as::<_, ProjectRow>(
        "SELECT * FROM projects WHERE creator_id = $1 ORDER BY created_at DESC",
    )
    .bind(creator_id)
    .fetch_all(pool)
    .await
}

pub async fn count_projects_by_creator(pool: &PgPool, creator_id: Uuid) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM projects WHERE creator_id = $1")
        .bind(creator_id)
        .fetch_one(pool)
        .await
}
