//! Role-specific dashboard counters.

use axum::{extract::State, Json};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::accounts::auth::CurrentUser;
use crate::applications::store::{count_by_applicant, count_to_creator};
use crate::errors::AppError;
use crate::invitations::store::{count_for, Side};
use crate::memberships::store::count_memberships;
use crate::models::application::RequestStatus;
use crate::models::user::Role;
use crate::projects::store::count_projects_by_creator;
use crate::state::AppState;

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum DashboardCounts {
    Applicant {
        applications_count: i64,
        pending_invitations_count: i64,
        memberships_count: i64,
    },
    Leader {
        projects_count: i64,
        pending_applications_count: i64,
        pending_sent_invitations_count: i64,
    },
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub role: Role,
    #[serde(flatten)]
    pub counts: DashboardCounts,
}

/// GET /api/v1/dashboard
pub async fn handle_dashboard(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<DashboardResponse>, AppError> {
    let role = current.role();
    let counts = if role.can_post_projects() {
        leader_counts(&state.db, current.id()).await?
    } else {
        applicant_counts(&state.db, current.id()).await?
    };
    Ok(Json(DashboardResponse { role, counts }))
}

async fn applicant_counts(pool: &PgPool, user_id: Uuid) -> Result<DashboardCounts, AppError> {
    let (applications_count, pending_invitations_count, memberships_count) = tokio::try_join!(
        count_by_applicant(pool, user_id),
        count_for(pool, Side::Received, user_id, Some(RequestStatus::Pending)),
        count_memberships(pool, user_id),
    )?;
    Ok(DashboardCounts::Applicant {
        applications_count,
        pending_invitations_count,
        memberships_count,
    })
}

async fn leader_counts(pool: &PgPool, user_id: Uuid) -> Result<DashboardCounts, AppError> {
    let (projects_count, pending_applications_count, pending_sent_invitations_count) = tokio::try_join!(
        count_projects_by_creator(pool, user_id),
        count_to_creator(pool, user_id, Some(RequestStatus::Pending)),
        count_for(pool, Side::Sent, user_id, Some(RequestStatus::Pending)),
    )?;
    Ok(DashboardCounts::Leader {
        projects_count,
        pending_applications_count,
        pending_sent_invitations_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leader_dashboard_serializes_flat() {
        let resp = DashboardResponse {
            role: Role::Company,
            counts: DashboardCounts::Leader {
                projects_count: 2,
                pending_applications_count: 5,
                pending_sent_invitations_count: 1,
            },
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "role": "company",
                "projects_count": 2,
                "pending_applications_count": 5,
                "pending_sent_invitations_count": 1
            })
        );
    }

    #[test]
    fn test_applicant_dashboard_fields() {
        let counts = DashboardCounts::Applicant {
            applications_count: 3,
            pending_invitations_count: 0,
            memberships_count: 1,
        };
        let json = serde_json::to_value(&counts).unwrap();
        assert_eq!(json["applications_count"], 3);
        assert!(json.get("projects_count").is_none());
    }
}
