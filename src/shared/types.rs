use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::shared::constants::MAX_PAGE_SIZE;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub meta: Option<Meta>,
    pub errors: Option<Vec<String>>,
}

/// Pagination metadata attached to list responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    pub total: i64,
    pub current_page: i64,
    pub total_pages: i64,
    pub limit: i64,
}

impl Meta {
    pub fn paginated(total: i64, page: &Page) -> Self {
        let total_pages = if total == 0 {
            1
        } else {
            (total + page.limit - 1) / page.limit
        };

        Self {
            total,
            current_page: page.page,
            total_pages,
            limit: page.limit,
        }
    }
}

// =============================================================================
// PAGINATION
// =============================================================================

/// Resolved page window (1-indexed page, clamped limit)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: i64,
    pub limit: i64,
}

impl Page {
    /// Clamp raw query values; an out-of-range limit falls back to `default_limit`
    pub fn new(page: Option<i64>, limit: Option<i64>, default_limit: i64) -> Self {
        let page = page.unwrap_or(1).max(1);
        let limit = match limit {
            Some(l) if (1..=MAX_PAGE_SIZE).contains(&l) => l,
            Some(l) if l > MAX_PAGE_SIZE => MAX_PAGE_SIZE,
            _ => default_limit,
        };
        Self { page, limit }
    }

    /// SQL OFFSET for this page
    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.limit
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: Option<T>, message: Option<String>, meta: Option<Meta>) -> Self {
        Self {
            success: true,
            data,
            message,
            meta,
            errors: None,
        }
    }

    pub fn error(message: Option<String>, errors: Option<Vec<String>>) -> ApiResponse<()> {
        ApiResponse {
            success: false,
            data: None,
            message,
            meta: None,
            errors,
        }
    }
}
