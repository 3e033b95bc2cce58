use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};

use crate::accounts::store::find_user_by_id;
use crate::errors::AppError;
use crate::models::user::{Role, UserRow};
use crate::state::AppState;

/// The authenticated caller, resolved from `Authorization: Bearer <token>`.
///
/// Handlers take this as an argument to require a login.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: UserRow,
    pub token: String,
}

impl CurrentUser {
    pub fn id(&self) -> uuid::Uuid {
        self.user.id
    }

    pub fn role(&self) -> Role {
        self.user.role()
    }

    pub fn require_project_poster(&self) -> Result<(), AppError> {
        if self.role().can_post_projects() {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "Only team leaders and companies can do this".to_string(),
            ))
        }
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)
            .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))?
            .to_string();

        let user_id = state
            .sessions
            .resolve(&token)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Session expired or invalid".to_string()))?;

        // The account may have been deleted while the session was alive.
        let user = find_user_by_id(&state.db, user_id)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Session expired or invalid".to_string()))?;

        Ok(CurrentUser { user, token })
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_bearer_token_extracted() {
        assert_eq!(bearer_token(&headers_with("Bearer abc123")), Some("abc123"));
        assert_eq!(bearer_token(&headers_with("bearer  abc123 ")), Some("abc123"));
    }

    #[test]
    fn test_non_bearer_schemes_rejected() {
        assert_eq!(bearer_token(&headers_with("Basic dXNlcjpwdw==")), None);
        assert_eq!(bearer_token(&headers_with("Bearer")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }
}
