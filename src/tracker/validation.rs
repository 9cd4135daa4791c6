//! Input validation. Every check returns the full list of problems so a form
//! can show them all at once; an empty list means the input is acceptable.

use crate::auth::is_valid_email;
use crate::types::SignupInput;
use chrono::NaiveDate;

/// Maximum length, in characters, of project names and task titles.
pub const MAX_NAME_LEN: usize = 200;

pub fn validate_project_input(
    name: &str,
    start_date: Option<NaiveDate>,
    target_end_date: Option<NaiveDate>,
) -> Vec<String> {
    let mut errors = Vec::new();
    let name = name.trim();
    if name.is_empty() {
        errors.push("Project name is required".to_string());
    } else if name.chars().count() > MAX_NAME_LEN {
        errors.push(format!(
            "Project name must be at most {} characters",
            MAX_NAME_LEN
        ));
    }
    if let (Some(start), Some(end)) = (start_date, target_end_date)
        && start > end
    {
        errors.push("Start date must not be after the target end date".to_string());
    }
    errors
}

pub fn validate_task_input(title: &str, estimated_hours: Option<f64>) -> Vec<String> {
    let mut errors = Vec::new();
    let title = title.trim();
    if title.is_empty() {
        errors.push("Task title is required".to_string());
    } else if title.chars().count() > MAX_NAME_LEN {
        errors.push(format!(
            "Task title must be at most {} characters",
            MAX_NAME_LEN
        ));
    }
    errors.extend(validate_estimated_hours(estimated_hours));
    errors
}

pub fn validate_estimated_hours(estimated_hours: Option<f64>) -> Option<String> {
    match estimated_hours {
        Some(hours) if !(hours >= 0.0 && hours.is_finite()) => {
            Some("Estimated hours must be a non-negative number".to_string())
        }
        _ => None,
    }
}

/// True for absolute `http://` or `https://` URLs.
pub fn is_web_url(url: &str) -> bool {
    let lower = url.trim().to_ascii_lowercase();
    ["http://", "https://"]
        .iter()
        .any(|scheme| lower.len() > scheme.len() && lower.starts_with(scheme))
}

pub fn validate_github_url(github_url: Option<&str>) -> Option<String> {
    match github_url {
        Some(url) if !is_web_url(url) => {
            Some("GitHub URL must start with http:// or https://".to_string())
        }
        _ => None,
    }
}

pub fn validate_milestone_input(title: &str, target_date: Option<NaiveDate>) -> Vec<String> {
    let mut errors = Vec::new();
    if title.trim().is_empty() {
        errors.push("Milestone title is required".to_string());
    }
    if target_date.is_none() {
        errors.push("Target date is required".to_string());
    }
    errors
}

/// Shape checks for a signup form. The duplicate-email check needs the store
/// and is done by the caller.
pub fn validate_signup(input: &SignupInput, min_password_len: usize) -> Vec<String> {
    if input.username.trim().is_empty()
        || input.email.trim().is_empty()
        || input.password.is_empty()
        || input.password_confirm.is_empty()
    {
        return vec!["All fields are required".to_string()];
    }

    let mut errors = Vec::new();
    if !is_valid_email(input.email.trim()) {
        errors.push("Invalid email address".to_string());
    }
    if input.password.chars().count() < min_password_len {
        errors.push(format!(
            "Password must be at least {} characters",
            min_password_len
        ));
    }
    if input.password != input.password_confirm {
        errors.push("Passwords do not match".to_string());
    }
    errors
}
