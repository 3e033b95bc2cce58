use crate::errors::AppError;

pub const TITLE_MAX_LEN: usize = 100;
pub const DURATION_MAX_LEN: usize = 50;

pub fn validate_title(title: &str) -> Result<(), AppError> {
    let len = title.chars().count();
    if len == 0 || len > TITLE_MAX_LEN {
        return Err(AppError::Validation(format!(
            "Title must be between 1 and {TITLE_MAX_LEN} characters"
        )));
    }
    Ok(())
}

pub fn validate_description(description: &str) -> Result<(), AppError> {
    if description.trim().is_empty() {
        return Err(AppError::Validation("Description is required".to_string()));
    }
    Ok(())
}

pub fn validate_team_size(team_size: i32) -> Result<(), AppError> {
    if team_size < 1 {
        return Err(AppError::Validation(
            "Team size must be at least 1".to_string(),
        ));
    }
    Ok(())
}

/// Free text such as "2 weeks" or "3 months".
pub fn validate_duration(duration: &str) -> Result<(), AppError> {
    let len = duration.chars().count();
    if len == 0 || len > DURATION_MAX_LEN {
        return Err(AppError::Validation(format!(
            "Duration must be between 1 and {DURATION_MAX_LEN} characters"
        )));
    }
    Ok(())
}
