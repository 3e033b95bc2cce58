//! Input rules for account fields, mirroring the usual username/email/password checks.

use crate::errors::AppError;

pub const USERNAME_MAX_LEN: usize = 150;
pub const PASSWORD_MIN_LEN: usize = 8;

pub fn validate_username(username: &str) -> Result<(), AppError> {
    let len = username.chars().count();
    if len == 0 || len > USERNAME_MAX_LEN {
        return Err(AppError::Validation(format!(
            "Username must be between 1 and {USERNAME_MAX_LEN} characters"
        )));
    }
    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
    {
        return Err(AppError::Validation(
            "Username may contain only letters, digits and @ . + - _".to_string(),
        ));
    }
    Ok(())
}

/// Structural check only: one `@`, non-empty local part, dotted domain.
pub fn validate_email(email: &str) -> Result<(), AppError> {
    let invalid = || AppError::Validation(format!("'{email}' is not a valid email address"));

    if email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') {
        return Err(invalid());
    }
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 || labels.iter().any(|l| l.is_empty()) {
        return Err(invalid());
    }
    Ok(())
}

pub fn validate_password(password: &str, confirmation: &str) -> Result<(), AppError> {
    if password != confirmation {
        return Err(AppError::Validation(
            "The two password fields didn't match".to_string(),
        ));
    }
    if password.chars().count() < PASSWORD_MIN_LEN {
        return Err(AppError::Validation(format!(
            "Password must contain at least {PASSWORD_MIN_LEN} characters"
        )));
    }
    if password.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::Validation(
            "Password can't be entirely numeric".to_string(),
        ));
    }
    Ok(())
}
