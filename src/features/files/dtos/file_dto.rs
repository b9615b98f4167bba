use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::features::files::models::{
    File, FileSortBy, FileStatus, SortOrder, StatusSummary, UserSummary,
};

/// Upload form for OpenAPI documentation only; the handler reads multipart directly
#[derive(Debug, ToSchema)]
#[schema(rename_all = "camelCase")]
#[allow(dead_code)]
pub struct UploadFileDto {
    /// The file to upload
    #[schema(format = Binary, content_media_type = "application/octet-stream")]
    pub file: String,
    /// Defaults to true
    pub is_public: Option<bool>,
    /// Protects downloads; requires sign-in
    pub password: Option<String>,
    /// RFC 3339 start of availability
    pub available_from: Option<DateTime<Utc>>,
    /// RFC 3339 end of availability
    pub available_to: Option<DateTime<Utc>>,
    /// Whitelisted emails, repeated or comma separated
    pub shared_with: Option<Vec<String>>,
}

/// Parsed upload form
#[derive(Debug, Clone, Default)]
pub struct UploadFileInput {
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Bytes,
    pub is_public: Option<bool>,
    pub password: Option<String>,
    pub available_from: Option<DateTime<Utc>>,
    pub available_to: Option<DateTime<Utc>>,
    pub shared_with: Vec<String>,
}

/// Full file view for owners and admins
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileResponseDto {
    pub id: Uuid,
    pub share_token: String,
    pub file_name: String,
    pub file_size: i64,
    pub mime_type: Option<String>,
    pub is_public: bool,
    pub has_password: bool,
    pub status: FileStatus,
    pub available_from: Option<DateTime<Utc>>,
    pub available_to: Option<DateTime<Utc>>,
    pub hours_remaining: Option<i64>,
    pub owner: Option<UserSummary>,
    pub shared_with: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl FileResponseDto {
    pub fn new(file: File, now: DateTime<Utc>) -> Self {
        Self {
            status: file.status(now),
            hours_remaining: file.hours_remaining(now),
            has_password: file.has_password(),
            id: file.id,
            share_token: file.share_token,
            file_name: file.file_name,
            file_size: file.file_size,
            mime_type: file.mime_type,
            is_public: file.is_public,
            available_from: file.available_from,
            available_to: file.available_to,
            owner: file.owner,
            shared_with: file.shared_with,
            created_at: file.created_at,
        }
    }
}

/// What anyone holding the share link may see
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FilePublicInfoDto {
    pub share_token: String,
    pub file_name: String,
    pub file_size: i64,
    pub mime_type: Option<String>,
    pub is_public: bool,
    pub has_password: bool,
    /// Only whitelisted users may download
    pub is_restricted: bool,
    pub status: FileStatus,
    pub available_from: Option<DateTime<Utc>>,
    pub available_to: Option<DateTime<Utc>>,
    pub hours_remaining: Option<i64>,
    pub owner_username: Option<String>,
}

impl FilePublicInfoDto {
    pub fn new(file: File, now: DateTime<Utc>) -> Self {
        Self {
            status: file.status(now),
            hours_remaining: file.hours_remaining(now),
            has_password: file.has_password(),
            is_restricted: !file.shared_with.is_empty(),
            share_token: file.share_token,
            file_name: file.file_name,
            file_size: file.file_size,
            mime_type: file.mime_type,
            is_public: file.is_public,
            available_from: file.available_from,
            available_to: file.available_to,
            owner_username: file.owner.map(|o| o.username),
        }
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct MyFilesQueryDto {
    /// Filter by status (active, pending, expired)
    pub status: Option<FileStatus>,
    /// Page number (1-indexed)
    pub page: Option<i64>,
    /// Items per page (max 100, default 20)
    pub limit: Option<i64>,
    /// createdAt (default) or fileName
    pub sort_by: Option<FileSortBy>,
    /// asc or desc (default)
    pub order: Option<SortOrder>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MyFilesResponseDto {
    pub files: Vec<FileResponseDto>,
    pub summary: StatusSummary,
}

/// Response DTO for delete operations
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeleteFileResponseDto {
    /// Confirmation that the file was deleted
    pub deleted: bool,
}
