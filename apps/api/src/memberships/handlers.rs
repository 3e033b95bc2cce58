use axum::{extract::State, Json};
use serde::Serialize;

use crate::accounts::auth::CurrentUser;
use crate::applications::store::{applications_by_applicant, ApplicationDetail};
use crate::errors::AppError;
use crate::memberships::store::{memberships_for_user, MembershipSummary};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ContributionsResponse {
    pub applications: Vec<ApplicationDetail>,
    pub memberships: Vec<MembershipSummary>,
}

/// GET /api/v1/contributions
pub async fn handle_my_contributions(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<ContributionsResponse>, AppError> {
    let (applications, memberships) = tokio::try_join!(
        applications_by_applicant(&state.db, current.id()),
        memberships_for_user(&state.db, current.id()),
    )?;
    Ok(Json(ContributionsResponse {
        applications,
        memberships,
    }))
}
