// Project postings: creation, browsing with skill ranking, management.

pub mod handlers;
pub mod store;
pub mod validation;

use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::project::ProjectRow;

pub async fn load_project(pool: &PgPool, id: Uuid) -> Result<ProjectRow, AppError> {
    store::find_project(pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Project {id} not found")))
}

/// Loads a project the caller created; anyone else gets 403.
pub async fn load_owned_project(
    pool: &PgPool,
    id: Uuid,
    user_id: Uuid,
) -> Result<ProjectRow, AppError> {
    let project = load_project(pool, id).await?;
    if project.creator_id != user_id {
        return Err(AppError::Forbidden(
            "Only the project creator can do this".to_string(),
        ));
    }
    Ok(project)
}
