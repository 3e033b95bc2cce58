use axum::{extract::State, Json};
use serde::Deserialize;

use crate::accounts::auth::CurrentUser;
use crate::errors::AppError;
use crate::state::AppState;
use crate::suggestions::Suggestions;

const MAX_DESCRIPTION_CHARS: usize = 10_000;

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub description: String,
}

/// POST /api/v1/tech-stack/analyze
pub async fn handle_analyze(
    State(state): State<AppState>,
    _current: CurrentUser,
    Json(req): Json<AnalyzeRequest>,
) -> Result<Json<Suggestions>, AppError> {
    let description = req.description.trim();
    if description.is_empty() {
        return Err(AppError::Validation("Description is required".to_string()));
    }
    if description.chars().count() > MAX_DESCRIPTION_CHARS {
        return Err(AppError::Validation(format!(
            "Description must be at most {MAX_DESCRIPTION_CHARS} characters"
        )));
    }
    Ok(Json(state.suggester.suggest(description).await))
}
