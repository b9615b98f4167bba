use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::modules::storage::Container;

/// Availability of a file relative to its window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Pending,
    Active,
    Expired,
}

impl FileStatus {
    /// `pending` before the window opens, `expired` once it closed, else `active`
    pub fn at(
        available_from: Option<DateTime<Utc>>,
        available_to: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Self {
        if available_from.is_some_and(|from| from > now) {
            Self::Pending
        } else if available_to.is_some_and(|to| to < now) {
            Self::Expired
        } else {
            Self::Active
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Expired => "expired",
        }
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "active" => Ok(Self::Active),
            "expired" => Ok(Self::Expired),
            other => Err(format!("Unknown file status '{}'", other)),
        }
    }
}

/// Public projection of a user (owner or downloader)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct UserSummary {
    pub id: Uuid,
    pub username: String,
    pub email: String,
}

/// Row shape of `files LEFT JOIN users`
#[derive(Debug, FromRow)]
pub struct FileRow {
    pub id: Uuid,
    pub share_token: String,
    pub file_name: String,
    pub storage_path: String,
    pub file_size: i64,
    pub mime_type: Option<String>,
    pub owner_id: Option<Uuid>,
    pub is_public: bool,
    pub password_hash: Option<String>,
    pub available_from: Option<DateTime<Utc>>,
    pub available_to: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub owner_username: Option<String>,
    pub owner_email: Option<String>,
}

/// A shared file with its owner summary and whitelist resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct File {
    pub id: Uuid,
    pub share_token: String,
    pub file_name: String,
    pub storage_path: String,
    pub file_size: i64,
    pub mime_type: Option<String>,
    pub owner_id: Option<Uuid>,
    pub is_public: bool,
    pub password_hash: Option<String>,
    pub available_from: Option<DateTime<Utc>>,
    pub available_to: Option<DateTime<Utc>>,
    pub shared_with: Vec<String>,
    pub owner: Option<UserSummary>,
    pub created_at: DateTime<Utc>,
}

impl File {
    pub fn from_row(row: FileRow, shared_with: Vec<String>) -> Self {
        let owner = match (row.owner_id, row.owner_username, row.owner_email) {
            (Some(id), Some(username), Some(email)) => Some(UserSummary {
                id,
                username,
                email,
            }),
            _ => None,
        };

        Self {
            id: row.id,
            share_token: row.share_token,
            file_name: row.file_name,
            storage_path: row.storage_path,
            file_size: row.file_size,
            mime_type: row.mime_type,
            owner_id: row.owner_id,
            is_public: row.is_public,
            password_hash: row.password_hash,
            available_from: row.available_from,
            available_to: row.available_to,
            shared_with,
            owner,
            created_at: row.created_at,
        }
    }

    pub fn status(&self, now: DateTime<Utc>) -> FileStatus {
        FileStatus::at(self.available_from, self.available_to, now)
    }

    pub fn container(&self) -> Container {
        Container::for_visibility(self.is_public)
    }

    pub fn has_password(&self) -> bool {
        self.password_hash.is_some()
    }

    pub fn is_anonymous(&self) -> bool {
        self.owner_id.is_none()
    }

    /// Whole hours left for an active file with an end date
    pub fn hours_remaining(&self, now: DateTime<Utc>) -> Option<i64> {
        match (self.status(now), self.available_to) {
            (FileStatus::Active, Some(to)) => Some((to - now).num_hours()),
            _ => None,
        }
    }
}

/// Insert payload for the registry; id and share token are assigned by the caller
#[derive(Debug, Clone)]
pub struct NewFile {
    pub id: Uuid,
    pub share_token: String,
    pub file_name: String,
    pub storage_path: String,
    pub file_size: i64,
    pub mime_type: Option<String>,
    pub owner: Option<UserSummary>,
    pub is_public: bool,
    pub password_hash: Option<String>,
    pub available_from: Option<DateTime<Utc>>,
    pub available_to: Option<DateTime<Utc>>,
    pub shared_with: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum FileSortBy {
    #[default]
    CreatedAt,
    FileName,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Filter and ordering for an owner's file listing
#[derive(Debug, Clone, Copy)]
pub struct OwnedFilesQuery {
    pub status: Option<FileStatus>,
    pub sort_by: FileSortBy,
    pub order: SortOrder,
    pub limit: i64,
    pub offset: i64,
}

/// Per-status counts of an owner's files
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema, FromRow)]
pub struct StatusSummary {
    pub total: i64,
    pub active: i64,
    pub pending: i64,
    pub expired: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn file_with_window(
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> File {
        File {
            id: Uuid::new_v4(),
            share_token: "tok".to_string(),
            file_name: "a.txt".to_string(),
            storage_path: "x-a.txt".to_string(),
            file_size: 1,
            mime_type: None,
            owner_id: None,
            is_public: true,
            password_hash: None,
            available_from: from,
            available_to: to,
            shared_with: vec![],
            owner: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_status_derivation() {
        let now = Utc::now();
        assert_eq!(FileStatus::at(None, None, now), FileStatus::Active);
        assert_eq!(
            FileStatus::at(Some(now + Duration::hours(1)), None, now),
            FileStatus::Pending
        );
        assert_eq!(
            FileStatus::at(None, Some(now - Duration::seconds(1)), now),
            FileStatus::Expired
        );
        assert_eq!(
            FileStatus::at(Some(now - Duration::hours(1)), Some(now + Duration::hours(1)), now),
            FileStatus::Active
        );
    }

    #[test]
    fn test_hours_remaining_only_for_active_with_end() {
        let now = Utc::now();
        let file = file_with_window(None, Some(now + Duration::hours(5) + Duration::minutes(30)));
        assert_eq!(file.hours_remaining(now), Some(5));

        let open_ended = file_with_window(None, None);
        assert_eq!(open_ended.hours_remaining(now), None);

        let pending = file_with_window(Some(now + Duration::hours(1)), Some(now + Duration::hours(9)));
        assert_eq!(pending.hours_remaining(now), None);
    }

    #[test]
    fn test_status_from_str() {
        assert_eq!("Expired".parse::<FileStatus>().unwrap(), FileStatus::Expired);
        assert!("gone".parse::<FileStatus>().is_err());
    }
}
