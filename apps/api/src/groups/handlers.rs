//! Axum route handlers for group chat.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::accounts::auth::CurrentUser;
use crate::errors::AppError;
use crate::groups::store::{find_group, groups_for_member, insert_message, messages_since, MessageView};
use crate::memberships::store::is_member;
use crate::models::group::GroupRow;
use crate::models::project::{ProjectRow, ProjectView};
use crate::projects::load_project;
use crate::state::AppState;

pub const MAX_MESSAGE_CHARS: usize = 5000;

#[derive(Debug, Deserialize)]
pub struct MessagesQuery {
    /// RFC 3339 timestamp; only messages created after it are returned.
    pub after: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct PostMessageRequest {
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct GroupChatResponse {
    pub group: GroupRow,
    pub project: ProjectView,
    pub is_leader: bool,
    pub messages: Vec<MessageView>,
}

/// Trimmed message body, rejecting blank and overlong content.
pub fn clean_content(content: &str) -> Result<&str, AppError> {
    let content = content.trim();
    if content.is_empty() {
        return Err(AppError::Validation("Message cannot be empty".to_string()));
    }
    if content.chars().count() > MAX_MESSAGE_CHARS {
        return Err(AppError::Validation(format!(
            "Message must be at most {MAX_MESSAGE_CHARS} characters"
        )));
    }
    Ok(content)
}

/// GET /api/v1/groups
pub async fn handle_list_groups(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<Vec<GroupRow>>, AppError> {
    Ok(Json(groups_for_member(&state.db, current.id()).await?))
}

/// GET /api/v1/groups/:id/messages
pub async fn handle_view_messages(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
    Query(query): Query<MessagesQuery>,
) -> Result<Json<GroupChatResponse>, AppError> {
    let (group, project) = load_accessible_group(&state, id, &current).await?;
    let messages = messages_since(&state.db, group.id, query.after).await?;
    Ok(Json(GroupChatResponse {
        is_leader: project.creator_id == current.id(),
        project: ProjectView::from(&project),
        group,
        messages,
    }))
}

/// POST /api/v1/groups/:id/messages
pub async fn handle_post_message(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<PostMessageRequest>,
) -> Result<(StatusCode, Json<MessageView>), AppError> {
    let content = clean_content(&req.content)?;
    let (group, _) = load_accessible_group(&state, id, &current).await?;

    let message = insert_message(&state.db, group.id, current.id(), content).await?;
    tracing::debug!("Message {} posted to group {}", message.id, group.id);
    Ok((
        StatusCode::CREATED,
        Json(MessageView {
            id: message.id,
            group_id: message.group_id,
            sender_id: message.sender_id,
            sender_username: current.user.username.clone(),
            content: message.content,
            created_at: message.created_at,
        }),
    ))
}

/// Members and the project creator can read and post; everyone else gets 403.
async fn load_accessible_group(
    state: &AppState,
    id: Uuid,
    current: &CurrentUser,
) -> Result<(GroupRow, ProjectRow), AppError> {
    let group = find_group(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Group {id} not found")))?;
    let project = load_project(&state.db, group.project_id).await?;

    if project.creator_id != current.id()
        && !is_member(&state.db, project.id, current.id()).await?
    {
        return Err(AppError::Forbidden(
            "Only project members can access this group".to_string(),
        ));
    }
    Ok((group, project))
}
