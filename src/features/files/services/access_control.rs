//! Access decisions for upload, download and management.
//!
//! Everything here is pure: callers pass the clock and the current policy.

use chrono::{DateTime, Utc};
use validator::ValidateEmail;

use crate::core::error::{AppError, Result};
use crate::features::auth::model::AuthenticatedUser;
use crate::features::files::models::{File, FileStatus};
use crate::features::policy::models::SystemPolicy;
use crate::shared::validation::normalize_email;

/// Upload parameters as supplied by the client
#[derive(Debug, Clone, Copy)]
pub struct UploadRequest<'a> {
    pub requester: Option<&'a AuthenticatedUser>,
    pub is_public: bool,
    pub password: Option<&'a str>,
    pub shared_with: &'a [String],
    pub available_from: Option<DateTime<Utc>>,
    pub available_to: Option<DateTime<Utc>>,
    pub file_size: i64,
}

/// Resolved values an accepted upload is stored with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadGrant {
    pub available_from: DateTime<Utc>,
    pub available_to: DateTime<Utc>,
    pub shared_with: Vec<String>,
}

/// Outcome of a download check that passed every non-credential rule
#[derive(Debug, PartialEq, Eq)]
pub enum DownloadDecision<'a> {
    Allow,
    /// The supplied credential must match this hash before streaming
    VerifyPassword { hash: &'a str, credential: &'a str },
}

pub fn authorize_upload(
    request: &UploadRequest<'_>,
    policy: &SystemPolicy,
    now: DateTime<Utc>,
) -> Result<UploadGrant> {
    let has_whitelist = request.shared_with.iter().any(|e| !e.trim().is_empty());

    if request.requester.is_none() {
        if !request.is_public {
            return Err(AppError::Unauthorized(
                "Sign in to upload private files".to_string(),
            ));
        }
        if request.password.is_some() {
            return Err(AppError::Unauthorized(
                "Sign in to protect files with a password".to_string(),
            ));
        }
        if has_whitelist {
            return Err(AppError::Unauthorized(
                "Sign in to share files with specific people".to_string(),
            ));
        }
    }

    if let Some(password) = request.password {
        let min = usize::try_from(policy.require_password_min_length).unwrap_or_default();
        if password.chars().count() < min {
            return Err(AppError::Validation(format!(
                "Password must be at least {} characters",
                policy.require_password_min_length
            )));
        }
    }

    let shared_with = normalize_shared_with(
        request.shared_with,
        request.requester.map(|u| u.email.as_str()),
    )?;

    let (available_from, available_to) = resolve_window(request, policy, now)?;

    if request.file_size > policy.max_file_size_bytes() {
        return Err(AppError::PayloadTooLarge(format!(
            "File exceeds the maximum size of {} MB",
            policy.max_file_size_mb
        )));
    }

    Ok(UploadGrant {
        available_from,
        available_to,
        shared_with,
    })
}

fn resolve_window(
    request: &UploadRequest<'_>,
    policy: &SystemPolicy,
    now: DateTime<Utc>,
) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let (from, to) = match (request.available_from, request.available_to) {
        (None, None) => return Ok((now, now + policy.default_validity())),
        (Some(from), None) => (from, from + policy.default_validity()),
        (None, Some(to)) => (now, to),
        (Some(from), Some(to)) => (from, to),
    };

    if from >= to {
        return Err(AppError::Validation(
            "availableFrom must be before availableTo".to_string(),
        ));
    }
    if to < now {
        return Err(AppError::Validation(
            "availableTo cannot be in the past".to_string(),
        ));
    }

    let duration = to - from;
    if duration < policy.min_validity() {
        return Err(AppError::Validation(format!(
            "File must be available for at least {} hour(s)",
            policy.min_validity_hours
        )));
    }
    if duration > policy.max_validity() {
        return Err(AppError::Validation(format!(
            "File cannot be available for more than {} day(s)",
            policy.max_validity_days
        )));
    }

    Ok((from, to))
}

/// Normalize whitelist entries, dropping blanks, duplicates and the owner's own address
pub fn normalize_shared_with(raw: &[String], owner_email: Option<&str>) -> Result<Vec<String>> {
    let owner_email = owner_email.map(normalize_email);
    let mut emails: Vec<String> = Vec::new();

    for entry in raw {
        let email = normalize_email(entry);
        if email.is_empty() {
            continue;
        }
        if !email.validate_email() {
            return Err(AppError::Validation(format!(
                "Invalid email address in sharedWith: {}",
                entry.trim()
            )));
        }
        if owner_email.as_deref() == Some(email.as_str()) || emails.contains(&email) {
            continue;
        }
        emails.push(email);
    }

    Ok(emails)
}

/// Download rules in fixed order: status, whitelist, then password
pub fn authorize_download<'a>(
    file: &'a File,
    requester: Option<&AuthenticatedUser>,
    credential: Option<&'a str>,
    now: DateTime<Utc>,
) -> Result<DownloadDecision<'a>> {
    let is_owner = requester.is_some_and(|u| u.owns(file.owner_id));

    match file.status(now) {
        FileStatus::Expired => {
            return Err(AppError::Gone("This file is no longer available".to_string()))
        }
        FileStatus::Pending if !is_owner => {
            return Err(AppError::Locked(
                "This file is not available yet".to_string(),
            ))
        }
        _ => {}
    }

    if !file.shared_with.is_empty() && !is_owner {
        let user = requester.ok_or_else(|| {
            AppError::Unauthorized("Sign in to access this file".to_string())
        })?;
        let email = normalize_email(&user.email);
        if !file.shared_with.iter().any(|e| *e == email) {
            return Err(AppError::Forbidden(
                "This file has not been shared with you".to_string(),
            ));
        }
    }

    match (&file.password_hash, is_owner) {
        (Some(hash), false) => {
            let credential = credential
                .filter(|c| !c.is_empty())
                .ok_or_else(|| AppError::Forbidden("Password required".to_string()))?;
            Ok(DownloadDecision::VerifyPassword { hash, credential })
        }
        _ => Ok(DownloadDecision::Allow),
    }
}

/// Viewing details, statistics and history: owner or admin
pub fn authorize_management(file: &File, requester: Option<&AuthenticatedUser>) -> Result<()> {
    let user = requester
        .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))?;

    if user.is_admin() || user.owns(file.owner_id) {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "You do not have access to this file".to_string(),
        ))
    }
}

/// Deletion additionally refuses anonymous-owned files
pub fn authorize_delete(file: &File, requester: Option<&AuthenticatedUser>) -> Result<()> {
    authorize_management(file, requester)?;

    if file.is_anonymous() {
        return Err(AppError::Forbidden(
            "Anonymous uploads cannot be deleted".to_string(),
        ));
    }
    Ok(())
}
