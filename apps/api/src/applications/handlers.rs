//! Axum route handlers for applications to projects.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::accounts::auth::CurrentUser;
use crate::accounts::store::find_user_by_id;
use crate::applications::store::{
    applications_by_applicant, applications_to_creator, count_to_creator,
    find_application_detail, has_applied, insert_application, resolve_pending, ApplicationDetail,
};
use crate::errors::AppError;
use crate::memberships::store::{add_member, is_member};
use crate::models::application::{ApplicationRow, Decision, RequestStatus};
use crate::models::project::ProjectRow;
use crate::models::user::{PublicUser, Role};
use crate::pagination::{Page, PageQuery};
use crate::projects::{load_owned_project, load_project};
use crate::state::AppState;

pub const APPLICATIONS_PER_PAGE: u32 = 10;
const MAX_MESSAGE_CHARS: usize = 2000;

#[derive(Debug, Default, Deserialize)]
pub struct ApplyRequest {
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DecisionRequest {
    pub action: Decision,
}

#[derive(Debug, Serialize)]
pub struct ApplicationReview {
    pub application: ApplicationDetail,
    pub applicant: PublicUser,
}

/// Trims an optional cover message; blank becomes `None`.
pub fn clean_message(message: Option<&str>) -> Result<Option<&str>, AppError> {
    let message = message.map(str::trim).filter(|m| !m.is_empty());
    if let Some(m) = message {
        if m.chars().count() > MAX_MESSAGE_CHARS {
            return Err(AppError::Validation(format!(
                "Message must be at most {MAX_MESSAGE_CHARS} characters"
            )));
        }
    }
    Ok(message)
}

/// What is known about an applicant and a project when they try to apply.
#[derive(Debug, Clone, Copy)]
pub struct ApplyAttempt<'a> {
    pub role: Role,
    pub applicant_id: Uuid,
    pub project: &'a ProjectRow,
    pub already_applied: bool,
    pub already_member: bool,
}

/// Applicants may apply once to an active project they neither own nor belong to.
pub fn check_can_apply(attempt: ApplyAttempt<'_>) -> Result<(), AppError> {
    if attempt.role != Role::Applicant {
        return Err(AppError::Forbidden(
            "Switch to the applicant role to apply to projects".to_string(),
        ));
    }
    if !attempt.project.is_active() {
        return Err(AppError::Validation(
            "This project is no longer accepting applications".to_string(),
        ));
    }
    if attempt.project.creator_id == attempt.applicant_id {
        return Err(AppError::Validation(
            "You cannot apply to your own project".to_string(),
        ));
    }
    if attempt.already_applied {
        return Err(AppError::Conflict(
            "You have already applied to this project".to_string(),
        ));
    }
    if attempt.already_member {
        return Err(AppError::Conflict(
            "You are already a member of this project".to_string(),
        ));
    }
    Ok(())
}

/// Only pending applications can be accepted or rejected.
pub fn check_can_decide(status: &str) -> Result<(), AppError> {
    if status != RequestStatus::Pending.as_str() {
        return Err(AppError::Conflict(
            "This application has already been decided".to_string(),
        ));
    }
    Ok(())
}

/// POST /api/v1/projects/:id/apply
pub async fn handle_apply(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(project_id): Path<Uuid>,
    body: Option<Json<ApplyRequest>>,
) -> Result<(StatusCode, Json<ApplicationRow>), AppError> {
    let req = body.map(|Json(r)| r).unwrap_or_default();
    let message = clean_message(req.message.as_deref())?;

    let project = load_project(&state.db, project_id).await?;
    let (already_applied, already_member) = tokio::try_join!(
        has_applied(&state.db, project_id, current.id()),
        is_member(&state.db, project_id, current.id()),
    )?;
    check_can_apply(ApplyAttempt {
        role: current.role(),
        applicant_id: current.id(),
        project: &project,
        already_applied,
        already_member,
    })?;

    let application = insert_application(&state.db, project_id, current.id(), message).await?;
    info!("User {} applied to project {}", current.id(), project_id);
    Ok((StatusCode::CREATED, Json(application)))
}

/// GET /api/v1/applications/mine
pub async fn handle_my_applications(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<Vec<ApplicationDetail>>, AppError> {
    Ok(Json(applications_by_applicant(&state.db, current.id()).await?))
}

/// GET /api/v1/applications
pub async fn handle_received_applications(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(page): Query<PageQuery>,
) -> Result<Json<Page<ApplicationDetail>>, AppError> {
    let (limit, offset) = page.limit_offset(APPLICATIONS_PER_PAGE);
    let items = applications_to_creator(&state.db, current.id(), limit, offset).await?;
    let total = count_to_creator(&state.db, current.id(), None).await?;
    Ok(Json(Page::from_slice(
        items,
        page.page(),
        APPLICATIONS_PER_PAGE,
        total.max(0) as u64,
    )))
}

/// GET /api/v1/applications/:id
pub async fn handle_view_application(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApplicationReview>, AppError> {
    let application = load_application(&state, id).await?;
    load_owned_project(&state.db, application.project_id, current.id()).await?;

    let applicant = find_user_by_id(&state.db, application.applicant_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Applicant no longer exists".to_string()))?;
    Ok(Json(ApplicationReview {
        application,
        applicant: applicant.into(),
    }))
}

/// POST /api/v1/applications/:id/decision
pub async fn handle_decide_application(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<DecisionRequest>,
) -> Result<Json<ApplicationRow>, AppError> {
    let application = load_application(&state, id).await?;
    load_owned_project(&state.db, application.project_id, current.id()).await?;
    check_can_decide(&application.status)?;

    // The conditional update still guards against a concurrent decision.
    let mut tx = state.db.begin().await?;
    let decided = resolve_pending(&mut *tx, id, req.action.resulting_status())
        .await?
        .ok_or_else(|| {
            AppError::Conflict("This application has already been decided".to_string())
        })?;
    if let Some(role) = req.action.grants_membership() {
        add_member(&mut *tx, decided.project_id, decided.applicant_id, role).await?;
    }
    tx.commit().await?;

    info!(
        "Application {} {} by {}",
        decided.id,
        decided.status,
        current.id()
    );
    Ok(Json(decided))
}

async fn load_application(state: &AppState, id: Uuid) -> Result<ApplicationDetail, AppError> {
    find_application_detail(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Application {id} not found")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use crate::models::project::ProjectStatus;

    fn make_project(creator_id: Uuid, status: ProjectStatus) -> ProjectRow {
        ProjectRow {
            id: Uuid::new_v4(),
            title: "Compiler".to_string(),
            description: "A toy compiler".to_string(),
            required_skills: Some("Rust".to_string()),
            team_size: 3,
            duration: "2 months".to_string(),
            status: status.as_str().to_string(),
            creator_id,
            created_at: Utc::now(),
        }
    }

    fn attempt(project: &ProjectRow) -> ApplyAttempt<'_> {
        ApplyAttempt {
            role: Role::Applicant,
            applicant_id: Uuid::new_v4(),
            project,
            already_applied: false,
            already_member: false,
        }
    }

    #[test]
    fn test_applicant_can_apply_to_active_project() {
        let project = make_project(Uuid::new_v4(), ProjectStatus::Active);
        assert!(check_can_apply(attempt(&project)).is_ok());
    }

    #[test]
    fn test_non_applicant_role_is_forbidden() {
        let project = make_project(Uuid::new_v4(), ProjectStatus::Active);
        for role in [Role::Leader, Role::Company] {
            let result = check_can_apply(ApplyAttempt {
                role,
                ..attempt(&project)
            });
            assert!(matches!(result, Err(AppError::Forbidden(_))));
        }
    }

    #[test]
    fn test_closed_project_rejects_applications() {
        for status in [ProjectStatus::Completed, ProjectStatus::Cancelled] {
            let project = make_project(Uuid::new_v4(), status);
            assert!(matches!(
                check_can_apply(attempt(&project)),
                Err(AppError::Validation(_))
            ));
        }
    }

    #[test]
    fn test_creator_cannot_apply_to_own_project() {
        let creator = Uuid::new_v4();
        let project = make_project(creator, ProjectStatus::Active);
        let result = check_can_apply(ApplyAttempt {
            applicant_id: creator,
            ..attempt(&project)
        });
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_second_application_conflicts() {
        let project = make_project(Uuid::new_v4(), ProjectStatus::Active);
        let result = check_can_apply(ApplyAttempt {
            already_applied: true,
            ..attempt(&project)
        });
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[test]
    fn test_member_cannot_apply() {
        let project = make_project(Uuid::new_v4(), ProjectStatus::Active);
        let result = check_can_apply(ApplyAttempt {
            already_member: true,
            ..attempt(&project)
        });
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[test]
    fn test_only_pending_applications_can_be_decided() {
        assert!(check_can_decide("pending").is_ok());
        for status in ["accepted", "rejected"] {
            assert!(matches!(check_can_decide(status), Err(AppError::Conflict(_))));
        }
    }

    #[test]
    fn test_clean_message_trims_and_drops_blank() {
        assert_eq!(clean_message(None).unwrap(), None);
        assert_eq!(clean_message(Some("   ")).unwrap(), None);
        assert_eq!(clean_message(Some("  hi there ")).unwrap(), Some("hi there"));
    }

    #[test]
    fn test_clean_message_rejects_overlong() {
        let long = "x".repeat(MAX_MESSAGE_CHARS + 1);
        assert!(matches!(
            clean_message(Some(&long)),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_decision_request_uses_action_field() {
        let req: DecisionRequest =
            serde_json::from_value(serde_json::json!({ "action": "reject" })).unwrap();
        assert_eq!(req.action, Decision::Reject);
        assert!(serde_json::from_value::<DecisionRequest>(serde_json::json!({ "action": "later" }))
            .is_err());
    }
}
