use axum::{
    extract::{Path, Query, State},
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::core::error::Result;
use crate::features::auth::model::AuthenticatedUser;
use crate::features::statistics::dtos::{DownloadHistoryDto, FileStatisticsDto, HistoryQueryDto};
use crate::features::statistics::services::StatisticsService;
use crate::shared::constants::DEFAULT_HISTORY_PAGE_SIZE;
use crate::shared::types::{ApiResponse, Meta, Page};

/// Download counters for a file
#[utoipa::path(
    get,
    path = "/api/files/stats/{id}",
    params(
        ("id" = Uuid, Path, description = "File id")
    ),
    responses(
        (status = 200, description = "File statistics", body = ApiResponse<FileStatisticsDto>),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "File not found or anonymous")
    ),
    tag = "statistics",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_file_stats(
    user: AuthenticatedUser,
    State(service): State<Arc<StatisticsService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<FileStatisticsDto>>> {
    let (file, stats) = service.get_stats(id, &user).await?;
    Ok(Json(ApiResponse::success(
        Some(FileStatisticsDto::new(&file, stats)),
        None,
        None,
    )))
}

/// Download history for a file, newest first
#[utoipa::path(
    get,
    path = "/api/files/download-history/{id}",
    params(
        ("id" = Uuid, Path, description = "File id"),
        HistoryQueryDto
    ),
    responses(
        (status = 200, description = "Download history", body = ApiResponse<Vec<DownloadHistoryDto>>),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "File not found")
    ),
    tag = "statistics",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_download_history(
    user: AuthenticatedUser,
    State(service): State<Arc<StatisticsService>>,
    Path(id): Path<Uuid>,
    Query(query): Query<HistoryQueryDto>,
) -> Result<Json<ApiResponse<Vec<DownloadHistoryDto>>>> {
    let page = Page::new(query.page, query.limit, DEFAULT_HISTORY_PAGE_SIZE);
    let (history, total) = service.get_history(id, &user, &page).await?;

    let items = history.into_iter().map(DownloadHistoryDto::from).collect();
    Ok(Json(ApiResponse::success(
        Some(items),
        None,
        Some(Meta::paginated(total, &page)),
    )))
}
