//! Axum route handlers for accounts, sessions and profiles.

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::accounts::auth::CurrentUser;
use crate::accounts::password::{hash_password, verify_password};
use crate::accounts::store::{
    count_users, find_taken_field, find_user_by_id, find_user_by_login, insert_user,
    search_users_page, set_profile_picture, set_role, update_profile, NewUser, TakenField,
    UserFilter,
};
use crate::accounts::validation::{validate_email, validate_password, validate_username};
use crate::db::{contains_pattern, search_pattern};
use crate::errors::AppError;
use crate::matching::{normalize_tech_stack, parse_tech_stack};
use crate::memberships::store::{memberships_for_user, MembershipSummary};
use crate::models::user::{PublicUser, Role};
use crate::pagination::{Page, PageQuery};
use crate::state::AppState;
use crate::uploads::{allowed_extension, content_type_for, profile_picture_key};

pub const CONTRIBUTORS_PER_PAGE: u32 = 12;
const PROFILE_PICTURE_FIELD: &str = "profile_picture";

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    #[serde(default)]
    pub tech_stack: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Username or email.
    pub login: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: PublicUser,
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct RoleRequest {
    pub role: String,
}

#[derive(Debug, Deserialize)]
pub struct ProfileUpdateRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub tech_stack: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct UserProfileResponse {
    pub user: PublicUser,
    pub memberships: Vec<MembershipSummary>,
}

#[derive(Debug, Deserialize)]
pub struct ContributorQuery {
    pub q: Option<String>,
    /// Comma-separated technologies, all of which must appear in the stack.
    pub tech: Option<String>,
    pub page: Option<u32>,
}

impl ContributorQuery {
    pub fn tech_patterns(&self) -> Vec<String> {
        parse_tech_stack(self.tech.as_deref())
            .iter()
            .map(|t| contains_pattern(t))
            .collect()
    }

    pub fn page_query(&self) -> PageQuery {
        PageQuery { page: self.page }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/auth/register
pub async fn handle_register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let username = req.username.trim();
    let email = req.email.trim();
    validate_username(username)?;
    validate_email(email)?;
    validate_password(&req.password, &req.password_confirm)?;
    let tech_stack = normalize_tech_stack(&req.tech_stack)?;

    ensure_available(&state, username, email, None).await?;

    let password_hash = hash_password(&req.password)?;
    let user = insert_user(
        &state.db,
        NewUser {
            username,
            email,
            password_hash: &password_hash,
            tech_stack: tech_stack.as_deref(),
            role: Role::default(),
        },
    )
    .await?;

    let token = state.sessions.issue(user.id).await?;
    info!("Registered user {} ({})", user.username, user.id);

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user: user.into(),
            token,
        }),
    ))
}

/// POST /api/v1/auth/login
pub async fn handle_login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let invalid = || AppError::Unauthorized("Invalid login credentials".to_string());

    let user = find_user_by_login(&state.db, req.login.trim())
        .await?
        .ok_or_else(invalid)?;
    if !verify_password(&req.password, &user.password_hash)? {
        return Err(invalid());
    }

    let token = state.sessions.issue(user.id).await?;
    info!("User {} logged in", user.id);
    Ok(Json(AuthResponse {
        user: user.into(),
        token,
    }))
}

/// POST /api/v1/auth/logout
pub async fn handle_logout(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<StatusCode, AppError> {
    state.sessions.revoke(&current.token).await?;
    info!("User {} logged out", current.id());
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/auth/me and GET /api/v1/account/profile
pub async fn handle_me(current: CurrentUser) -> Json<PublicUser> {
    Json(PublicUser::from(&current.user))
}

/// POST /api/v1/account/role
pub async fn handle_select_role(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(req): Json<RoleRequest>,
) -> Result<Json<PublicUser>, AppError> {
    let role: Role = req
        .role
        .parse()
        .map_err(|_| AppError::Validation("Invalid role selected".to_string()))?;
    let user = set_role(&state.db, current.id(), role).await?;
    info!("User {} switched role to {role}", user.id);
    Ok(Json(user.into()))
}

/// PATCH /api/v1/account/profile
pub async fn handle_update_profile(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(req): Json<ProfileUpdateRequest>,
) -> Result<Json<PublicUser>, AppError> {
    let existing = &current.user;
    let username = req
        .username
        .as_deref()
        .map(str::trim)
        .unwrap_or(&existing.username);
    let email = req.email.as_deref().map(str::trim).unwrap_or(&existing.email);
    validate_username(username)?;
    validate_email(email)?;

    let tech_stack = match &req.tech_stack {
        Some(entries) => normalize_tech_stack(entries)?,
        None => existing.tech_stack.clone(),
    };

    ensure_available(&state, username, email, Some(existing.id)).await?;

    let user = update_profile(
        &state.db,
        existing.id,
        username,
        email,
        tech_stack.as_deref(),
    )
    .await?;
    info!("User {} updated their profile", user.id);
    Ok(Json(user.into()))
}

/// POST /api/v1/account/profile/picture (multipart, field `profile_picture`)
pub async fn handle_upload_picture(
    State(state): State<AppState>,
    current: CurrentUser,
    mut multipart: Multipart,
) -> Result<Json<PublicUser>, AppError> {
    let (filename, data) =
        read_picture_field(&mut multipart, state.config.max_upload_bytes).await?;
    let extension = allowed_extension(&filename).ok_or_else(|| {
        AppError::Validation("Profile pictures must be .png, .jpg or .jpeg files".to_string())
    })?;

    let key = profile_picture_key(&filename, &extension);
    state
        .uploads
        .put(&key, content_type_for(&extension), data)
        .await?;
    let user = set_profile_picture(&state.db, current.id(), &key).await?;

    if let Some(old_key) = current.user.profile_picture.as_deref() {
        if let Err(e) = state.uploads.delete(old_key).await {
            warn!("Failed to delete old profile picture {old_key}: {e}");
        }
    }

    Ok(Json(user.into()))
}

/// Pulls the `profile_picture` file out of a multipart body. Bodies cut off by
/// the route's body limit and files over `limit` bytes are both rejected with 413.
pub async fn read_picture_field(
    multipart: &mut Multipart,
    limit: usize,
) -> Result<(String, Bytes), AppError> {
    let mut upload = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::from_multipart(e, limit))?
    {
        if field.name() != Some(PROFILE_PICTURE_FIELD) {
            continue;
        }
        let filename = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| AppError::Validation("Uploaded file has no name".to_string()))?;
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::from_multipart(e, limit))?;
        upload = Some((filename, data));
    }

    let (filename, data) = upload.ok_or_else(|| {
        AppError::Validation(format!("Missing '{PROFILE_PICTURE_FIELD}' file field"))
    })?;
    if data.len() > limit {
        return Err(AppError::PayloadTooLarge { limit });
    }
    if data.is_empty() {
        return Err(AppError::Validation("Uploaded file is empty".to_string()));
    }
    Ok((filename, data))
}

/// GET /api/v1/users/:id
pub async fn handle_view_user(
    State(state): State<AppState>,
    _current: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<UserProfileResponse>, AppError> {
    let user = find_user_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {id} not found")))?;
    let memberships = memberships_for_user(&state.db, id).await?;
    Ok(Json(UserProfileResponse {
        user: user.into(),
        memberships,
    }))
}

/// GET /api/v1/contributors
pub async fn handle_list_contributors(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(query): Query<ContributorQuery>,
) -> Result<Json<Page<PublicUser>>, AppError> {
    let search = search_pattern(query.q.as_deref());
    let tech_patterns = query.tech_patterns();
    let exclude = [current.id()];
    let filter = UserFilter {
        exclude: &exclude,
        search: search.as_deref(),
        tech_patterns: &tech_patterns,
    };

    let page = query.page_query();
    let (limit, offset) = page.limit_offset(CONTRIBUTORS_PER_PAGE);
    let (users, total) = tokio::try_join!(
        search_users_page(&state.db, filter, limit, offset),
        count_users(&state.db, filter),
    )?;

    let users: Vec<PublicUser> = users.into_iter().map(PublicUser::from).collect();
    Ok(Json(Page::from_slice(
        users,
        page.page(),
        CONTRIBUTORS_PER_PAGE,
        total.max(0) as u64,
    )))
}

async fn ensure_available(
    state: &AppState,
    username: &str,
    email: &str,
    exclude: Option<Uuid>,
) -> Result<(), AppError> {
    match find_taken_field(&state.db, username, email, exclude).await? {
        Some(TakenField::Username) => Err(AppError::Conflict(format!(
            "Username '{username}' is already taken"
        ))),
        Some(TakenField::Email) => Err(AppError::Conflict(format!(
            "An account with email '{email}' already exists"
        ))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        extract::DefaultBodyLimit,
        http::{header, Request},
        routing::post,
        Router,
    };
    use tower::ServiceExt;

    const BOUNDARY: &str = "crewd-test-boundary";
    const PICTURE_LIMIT: usize = 1024;

    async fn accept_picture(mut multipart: Multipart) -> Result<StatusCode, AppError> {
        read_picture_field(&mut multipart, PICTURE_LIMIT).await?;
        Ok(StatusCode::NO_CONTENT)
    }

    // The body limit sits above the file limit, like the real picture route.
    fn picture_router() -> Router {
        Router::new()
            .route("/picture", post(accept_picture))
            .layer(DefaultBodyLimit::max(4 * PICTURE_LIMIT))
    }

    fn picture_upload(file: &[u8]) -> Request<Body> {
        let mut body = format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"{PROFILE_PICTURE_FIELD}\"; filename=\"me.png\"\r\n\
             Content-Type: image/png\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(file);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        Request::post("/picture")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_small_picture_is_read() {
        let response = picture_router()
            .oneshot(picture_upload(&[7u8; 100]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_body_over_route_limit_is_413() {
        let response = picture_router()
            .oneshot(picture_upload(&vec![7u8; 200 * 1024]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_file_over_picture_limit_is_413() {
        let response = picture_router()
            .oneshot(picture_upload(&vec![7u8; 2 * PICTURE_LIMIT]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_missing_picture_field_is_400() {
        let body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"other\"\r\n\r\nhi\r\n--{BOUNDARY}--\r\n"
        );
        let request = Request::post("/picture")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap();
        let response = picture_router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_contributor_query_builds_escaped_patterns() {
        let query = ContributorQuery {
            q: None,
            tech: Some("Rust, C#,,".to_string()),
            page: None,
        };
        assert_eq!(query.tech_patterns(), vec!["%Rust%", "%C#%"]);
        assert_eq!(query.page_query().page(), 1);
    }

    #[test]
    fn test_register_request_defaults_tech_stack() {
        let req: RegisterRequest = serde_json::from_value(serde_json::json!({
            "username": "ada",
            "email": "ada@example.com",
            "password": "s3cret-pass",
            "password_confirm": "s3cret-pass"
        }))
        .unwrap();
        assert!(req.tech_stack.is_empty());
    }
}
