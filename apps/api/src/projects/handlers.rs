//! Axum route handlers for the Projects API.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::accounts::auth::CurrentUser;
use crate::accounts::handlers::{ContributorQuery, CONTRIBUTORS_PER_PAGE};
use crate::accounts::store::{find_user_by_id, search_users, UserFilter};
use crate::applications::store::{has_applied, pending_for_project, ApplicationDetail};
use crate::db::{contains_pattern, search_pattern};
use crate::errors::AppError;
use crate::invitations::store::pending_recipient_ids;
use crate::matching::catalog::TECH_CHOICES;
use crate::matching::{
    normalize_tech_stack, parse_tech_stack, rank_by, score_contributor_for_project,
    score_project_for_user, MatchScore,
};
use crate::memberships::store::{is_member, member_ids, project_members, MemberView};
use crate::models::project::{ProjectRow, ProjectStatus, ProjectView};
use crate::models::user::PublicUser;
use crate::pagination::Page;
use crate::projects::store::{
    create_project, projects_by_creator, search_projects, update_project, NewProject,
    ProjectChanges,
};
use crate::projects::validation::{
    validate_description, validate_duration, validate_team_size, validate_title,
};
use crate::projects::{load_owned_project, load_project};
use crate::state::AppState;

pub const PROJECTS_PER_PAGE: u32 = 9;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub required_skills: Vec<String>,
    pub team_size: i32,
    pub duration: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProjectRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub required_skills: Option<Vec<String>>,
    pub team_size: Option<i32>,
    pub duration: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BrowseQuery {
    pub q: Option<String>,
    /// A status name, or `all`. Defaults to `active`.
    pub status: Option<String>,
    pub tech: Option<String>,
    pub page: Option<u32>,
}

impl BrowseQuery {
    fn status_filter(&self) -> Result<Option<ProjectStatus>, AppError> {
        match self.status.as_deref().map(str::trim) {
            None | Some("") => Ok(Some(ProjectStatus::Active)),
            Some("all") => Ok(None),
            Some(s) => s
                .parse::<ProjectStatus>()
                .map(Some)
                .map_err(AppError::Validation),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProjectListItem {
    #[serde(flatten)]
    pub project: ProjectView,
    #[serde(flatten)]
    pub score: MatchScore,
}

#[derive(Debug, Serialize)]
pub struct ProjectDetailResponse {
    pub project: ProjectView,
    pub creator: Option<PublicUser>,
    /// Members other than the creator.
    pub team_members: Vec<MemberView>,
    pub has_applied: bool,
    pub is_creator: bool,
    pub is_member: bool,
}

#[derive(Debug, Serialize)]
pub struct ManageProjectResponse {
    pub project: ProjectView,
    pub members: Vec<MemberView>,
    pub pending_applications: Vec<ApplicationDetail>,
}

#[derive(Debug, Serialize)]
pub struct ContributorMatch {
    #[serde(flatten)]
    pub user: PublicUser,
    #[serde(flatten)]
    pub score: MatchScore,
}

#[derive(Debug, Serialize)]
pub struct FindContributorsResponse {
    pub project: ProjectView,
    pub contributors: Page<ContributorMatch>,
    pub pending_invitation_user_ids: Vec<Uuid>,
}

// ────────────────────────────────────────────────────────────────────────────
// Ranking
// ────────────────────────────────────────────────────────────────────────────

/// Scores projects against the user's stack. With a non-empty stack the
/// result is ordered by match count; otherwise the incoming (newest-first)
/// order is kept.
pub fn rank_projects_for_user(projects: Vec<ProjectRow>, user_stack: &[String]) -> Vec<ProjectListItem> {
    let mut items: Vec<ProjectListItem> = projects
        .iter()
        .map(|p| ProjectListItem {
            score: score_project_for_user(user_stack, &p.required_skills_list()),
            project: ProjectView::from(p),
        })
        .collect();
    if !user_stack.is_empty() {
        rank_by(&mut items, |item| item.score.match_score);
    }
    items
}

/// Scores candidates against the project's skills, best coverage first when
/// the project lists any skills.
pub fn rank_contributors_for_project(
    candidates: Vec<PublicUser>,
    project_skills: &[String],
) -> Vec<ContributorMatch> {
    let mut matches: Vec<ContributorMatch> = candidates
        .into_iter()
        .map(|user| ContributorMatch {
            score: score_contributor_for_project(project_skills, &user.tech_stack),
            user,
        })
        .collect();
    if !project_skills.is_empty() {
        rank_by(&mut matches, |m| m.score.match_percentage);
    }
    matches
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/tech-choices
pub async fn handle_tech_choices() -> Json<&'static [&'static str]> {
    Json(TECH_CHOICES)
}

/// POST /api/v1/projects
pub async fn handle_create_project(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(req): Json<CreateProjectRequest>,
) -> Result<(StatusCode, Json<ProjectView>), AppError> {
    current.require_project_poster()?;

    let title = req.title.trim();
    let duration = req.duration.trim();
    validate_title(title)?;
    validate_description(&req.description)?;
    validate_team_size(req.team_size)?;
    validate_duration(duration)?;
    let required_skills = normalize_tech_stack(&req.required_skills)?;

    let project = create_project(
        &state.db,
        current.id(),
        NewProject {
            title,
            description: &req.description,
            required_skills: required_skills.as_deref(),
            team_size: req.team_size,
            duration,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(ProjectView::from(&project))))
}

/// GET /api/v1/projects
pub async fn handle_browse_projects(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(query): Query<BrowseQuery>,
) -> Result<Json<Page<ProjectListItem>>, AppError> {
    let status = query.status_filter()?;
    let search = search_pattern(query.q.as_deref());
    let tech_patterns: Vec<String> = parse_tech_stack(query.tech.as_deref())
        .iter()
        .map(|t| contains_pattern(t))
        .collect();

    let projects = search_projects(&state.db, status, search.as_deref(), &tech_patterns).await?;
    let items = rank_projects_for_user(projects, &current.user.tech_stack_list());

    Ok(Json(Page::paginate(
        items,
        query.page.unwrap_or(1).max(1),
        PROJECTS_PER_PAGE,
    )))
}

/// GET /api/v1/projects/mine
pub async fn handle_my_projects(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<Vec<ProjectView>>, AppError> {
    let projects = projects_by_creator(&state.db, current.id()).await?;
    Ok(Json(projects.iter().map(ProjectView::from).collect()))
}

/// GET /api/v1/projects/:id
pub async fn handle_view_project(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ProjectDetailResponse>, AppError> {
    let project = load_project(&state.db, id).await?;
    let creator = find_user_by_id(&state.db, project.creator_id)
        .await?
        .map(PublicUser::from);
    let team_members = project_members(&state.db, id)
        .await?
        .into_iter()
        .filter(|m| m.user_id != project.creator_id)
        .collect();

    Ok(Json(ProjectDetailResponse {
        has_applied: has_applied(&state.db, id, current.id()).await?,
        is_creator: project.creator_id == current.id(),
        is_member: is_member(&state.db, id, current.id()).await?,
        project: ProjectView::from(&project),
        creator,
        team_members,
    }))
}

/// GET /api/v1/projects/:id/manage
pub async fn handle_manage_project(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ManageProjectResponse>, AppError> {
    let project = load_owned_project(&state.db, id, current.id()).await?;
    Ok(Json(ManageProjectResponse {
        members: project_members(&state.db, id).await?,
        pending_applications: pending_for_project(&state.db, id).await?,
        project: ProjectView::from(&project),
    }))
}

/// PATCH /api/v1/projects/:id
pub async fn handle_update_project(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateProjectRequest>,
) -> Result<Json<ProjectView>, AppError> {
    let existing = load_owned_project(&state.db, id, current.id()).await?;

    let title = req.title.as_deref().map(str::trim).unwrap_or(&existing.title);
    let description = req.description.as_deref().unwrap_or(&existing.description);
    let team_size = req.team_size.unwrap_or(existing.team_size);
    let duration = req
        .duration
        .as_deref()
        .map(str::trim)
        .unwrap_or(&existing.duration);
    let status = match req.status.as_deref() {
        Some(s) => s.parse::<ProjectStatus>().map_err(AppError::Validation)?,
        None => existing.status.parse::<ProjectStatus>().unwrap_or_default(),
    };
    validate_title(title)?;
    validate_description(description)?;
    validate_team_size(team_size)?;
    validate_duration(duration)?;
    let required_skills = match &req.required_skills {
        Some(skills) => normalize_tech_stack(skills)?,
        None => existing.required_skills.clone(),
    };

    let project = update_project(
        &state.db,
        id,
        ProjectChanges {
            title,
            description,
            required_skills: required_skills.as_deref(),
            team_size,
            duration,
            status,
        },
    )
    .await?;
    tracing::info!("Project {} updated by {}", project.id, current.id());
    Ok(Json(ProjectView::from(&project)))
}

/// GET /api/v1/projects/:id/contributors
pub async fn handle_find_contributors(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
    Query(query): Query<ContributorQuery>,
) -> Result<Json<FindContributorsResponse>, AppError> {
    let project = load_owned_project(&state.db, id, current.id()).await?;

    let mut exclude = member_ids(&state.db, id).await?;
    exclude.push(current.id());

    let search = search_pattern(query.q.as_deref());
    let tech_patterns = query.tech_patterns();
    let filter = UserFilter {
        exclude: &exclude,
        search: search.as_deref(),
        tech_patterns: &tech_patterns,
    };
    // Ranking by match score needs the whole candidate set before slicing.
    let candidates: Vec<PublicUser> = search_users(&state.db, filter)
        .await?
        .into_iter()
        .map(PublicUser::from)
        .collect();
    let ranked = rank_contributors_for_project(candidates, &project.required_skills_list());

    Ok(Json(FindContributorsResponse {
        contributors: Page::paginate(ranked, query.page_query().page(), CONTRIBUTORS_PER_PAGE),
        pending_invitation_user_ids: pending_recipient_ids(&state.db, id).await?,
        project: ProjectView::from(&project),
    }))
}
