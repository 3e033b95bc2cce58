//! Axum route handlers for project invitations.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::accounts::auth::CurrentUser;
use crate::accounts::store::find_user_by_id;
use crate::applications::handlers::clean_message;
use crate::errors::AppError;
use crate::invitations::store::{
    count_for, delete_pending, find_for_recipient, find_invitation, insert_invitation, list_for,
    reopen_invitation, resolve_pending, InvitationDetail, Side,
};
use crate::memberships::store::{add_member, is_member};
use crate::models::application::Decision;
use crate::models::invitation::InvitationRow;
use crate::pagination::{Page, PageQuery};
use crate::projects::load_owned_project;
use crate::state::AppState;

pub const INVITATIONS_PER_PAGE: u32 = 10;

#[derive(Debug, Default, Deserialize)]
pub struct InviteRequest {
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RespondRequest {
    pub action: Decision,
}

/// How an invitation request is carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InviteAction {
    Create,
    /// Reopen the answered invitation with this id.
    Reopen(Uuid),
}

/// Decides how `sender_id` may invite `recipient_id`, given any invitation
/// the recipient already has for the project.
pub fn plan_invite(
    sender_id: Uuid,
    recipient_id: Uuid,
    recipient_is_member: bool,
    existing: Option<&InvitationRow>,
) -> Result<InviteAction, AppError> {
    if recipient_id == sender_id {
        return Err(AppError::Validation("You cannot invite yourself".to_string()));
    }
    if recipient_is_member {
        return Err(AppError::Conflict(
            "This user is already a member of the project".to_string(),
        ));
    }
    match existing {
        Some(invitation) if invitation.is_pending() => Err(AppError::Conflict(
            "This user already has a pending invitation".to_string(),
        )),
        Some(invitation) => Ok(InviteAction::Reopen(invitation.id)),
        None => Ok(InviteAction::Create),
    }
}

/// Only the recipient answers, and only while the invitation is pending.
pub fn check_can_respond(invitation: &InvitationRow, user_id: Uuid) -> Result<(), AppError> {
    if invitation.recipient_id != user_id {
        return Err(AppError::Forbidden(
            "Only the invited user can respond to this invitation".to_string(),
        ));
    }
    if !invitation.is_pending() {
        return Err(AppError::Conflict(
            "This invitation has already been answered".to_string(),
        ));
    }
    Ok(())
}

/// Only the sender cancels, and only while the invitation is pending.
pub fn check_can_cancel(invitation: &InvitationRow, user_id: Uuid) -> Result<(), AppError> {
    if invitation.sender_id != user_id {
        return Err(AppError::Forbidden(
            "Only the sender can cancel this invitation".to_string(),
        ));
    }
    if !invitation.is_pending() {
        return Err(AppError::Conflict(
            "Answered invitations cannot be cancelled".to_string(),
        ));
    }
    Ok(())
}

/// POST /api/v1/projects/:id/invitations/:user_id
pub async fn handle_invite(
    State(state): State<AppState>,
    current: CurrentUser,
    Path((project_id, recipient_id)): Path<(Uuid, Uuid)>,
    body: Option<Json<InviteRequest>>,
) -> Result<(StatusCode, Json<InvitationRow>), AppError> {
    let req = body.map(|Json(r)| r).unwrap_or_default();
    let message = clean_message(req.message.as_deref())?;

    load_owned_project(&state.db, project_id, current.id()).await?;
    find_user_by_id(&state.db, recipient_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {recipient_id} not found")))?;
    let (recipient_is_member, existing) = tokio::try_join!(
        is_member(&state.db, project_id, recipient_id),
        find_for_recipient(&state.db, project_id, recipient_id),
    )?;

    let invitation = match plan_invite(
        current.id(),
        recipient_id,
        recipient_is_member,
        existing.as_ref(),
    )? {
        InviteAction::Create => {
            insert_invitation(&state.db, project_id, current.id(), recipient_id, message).await?
        }
        InviteAction::Reopen(id) => reopen_invitation(&state.db, id, current.id(), message)
            .await?
            .ok_or_else(|| {
                AppError::Conflict("This user already has a pending invitation".to_string())
            })?,
    };

    info!(
        "User {} invited {} to project {}",
        current.id(),
        recipient_id,
        project_id
    );
    Ok((StatusCode::CREATED, Json(invitation)))
}

/// GET /api/v1/invitations
pub async fn handle_received_invitations(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(page): Query<PageQuery>,
) -> Result<Json<Page<InvitationDetail>>, AppError> {
    list_page(&state, Side::Received, current.id(), page).await
}

/// GET /api/v1/invitations/sent
pub async fn handle_sent_invitations(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(page): Query<PageQuery>,
) -> Result<Json<Page<InvitationDetail>>, AppError> {
    list_page(&state, Side::Sent, current.id(), page).await
}

/// POST /api/v1/invitations/:id/respond
pub async fn handle_respond(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<RespondRequest>,
) -> Result<Json<InvitationRow>, AppError> {
    let invitation = load_invitation(&state, id).await?;
    check_can_respond(&invitation, current.id())?;

    let mut tx = state.db.begin().await?;
    let answered = resolve_pending(&mut *tx, id, req.action.resulting_status())
        .await?
        .ok_or_else(|| {
            AppError::Conflict("This invitation has already been answered".to_string())
        })?;
    if let Some(role) = req.action.grants_membership() {
        add_member(&mut *tx, answered.project_id, answered.recipient_id, role).await?;
    }
    tx.commit().await?;

    info!("Invitation {} {} by {}", answered.id, answered.status, current.id());
    Ok(Json(answered))
}

/// DELETE /api/v1/invitations/:id
pub async fn handle_cancel(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let invitation = load_invitation(&state, id).await?;
    check_can_cancel(&invitation, current.id())?;
    if !delete_pending(&state.db, id).await? {
        return Err(AppError::Conflict(
            "Answered invitations cannot be cancelled".to_string(),
        ));
    }
    info!("Invitation {id} cancelled by {}", current.id());
    Ok(StatusCode::NO_CONTENT)
}

async fn list_page(
    state: &AppState,
    side: Side,
    user_id: Uuid,
    page: PageQuery,
) -> Result<Json<Page<InvitationDetail>>, AppError> {
    let (limit, offset) = page.limit_offset(INVITATIONS_PER_PAGE);
    let items = list_for(&state.db, side, user_id, limit, offset).await?;
    let total = count_for(&state.db, side, user_id, None).await?;
    Ok(Json(Page::from_slice(
        items,
        page.page(),
        INVITATIONS_PER_PAGE,
        total.max(0) as u64,
    )))
}

async fn load_invitation(state: &AppState, id: Uuid) -> Result<InvitationRow, AppError> {
    find_invitation(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Invitation {id} not found")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn make_invitation(sender_id: Uuid, recipient_id: Uuid, status: &str) -> InvitationRow {
        InvitationRow {
            id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            sender_id,
            recipient_id,
            status: status.to_string(),
            message: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_fresh_invite_is_created() {
        let action = plan_invite(Uuid::new_v4(), Uuid::new_v4(), false, None).unwrap();
        assert_eq!(action, InviteAction::Create);
    }

    #[test]
    fn test_self_invite_is_rejected_before_membership() {
        let me = Uuid::new_v4();
        // The creator is always a member of their own project.
        assert!(matches!(
            plan_invite(me, me, true, None),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_member_cannot_be_invited() {
        assert!(matches!(
            plan_invite(Uuid::new_v4(), Uuid::new_v4(), true, None),
            Err(AppError::Conflict(_))
        ));
    }

    #[test]
    fn test_pending_invitation_conflicts_and_answered_is_reopened() {
        let (sender, recipient) = (Uuid::new_v4(), Uuid::new_v4());
        let pending = make_invitation(sender, recipient, "pending");
        assert!(matches!(
            plan_invite(sender, recipient, false, Some(&pending)),
            Err(AppError::Conflict(_))
        ));
        for status in ["accepted", "rejected"] {
            let answered = make_invitation(sender, recipient, status);
            assert_eq!(
                plan_invite(sender, recipient, false, Some(&answered)).unwrap(),
                InviteAction::Reopen(answered.id)
            );
        }
    }

    #[test]
    fn test_only_recipient_responds_while_pending() {
        let (sender, recipient) = (Uuid::new_v4(), Uuid::new_v4());
        let pending = make_invitation(sender, recipient, "pending");
        assert!(check_can_respond(&pending, recipient).is_ok());
        assert!(matches!(
            check_can_respond(&pending, sender),
            Err(AppError::Forbidden(_))
        ));
        let answered = make_invitation(sender, recipient, "accepted");
        assert!(matches!(
            check_can_respond(&answered, recipient),
            Err(AppError::Conflict(_))
        ));
    }

    #[test]
    fn test_only_sender_cancels_while_pending() {
        let (sender, recipient) = (Uuid::new_v4(), Uuid::new_v4());
        let pending = make_invitation(sender, recipient, "pending");
        assert!(check_can_cancel(&pending, sender).is_ok());
        assert!(matches!(
            check_can_cancel(&pending, recipient),
            Err(AppError::Forbidden(_))
        ));
        let answered = make_invitation(sender, recipient, "rejected");
        assert!(matches!(
            check_can_cancel(&answered, sender),
            Err(AppError::Conflict(_))
        ));
    }

    #[test]
    fn test_respond_request_parses_action() {
        let req: RespondRequest =
            serde_json::from_value(serde_json::json!({ "action": "accept" })).unwrap();
        assert_eq!(req.action, Decision::Accept);
    }

    #[test]
    fn test_invite_request_message_is_optional() {
        let req: InviteRequest = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(req.message.is_none());
    }
}
