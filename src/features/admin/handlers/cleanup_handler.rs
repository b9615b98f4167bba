use std::sync::Arc;

use axum::{extract::State, Json};

use crate::core::error::Result;
use crate::features::admin::dtos::CleanupResponseDto;
use crate::features::admin::services::CleanupService;
use crate::shared::types::ApiResponse;

/// Delete every expired file
#[utoipa::path(
    post,
    path = "/api/admin/cleanup",
    responses(
        (status = 200, description = "Cleanup finished", body = ApiResponse<CleanupResponseDto>),
        (status = 401, description = "Admin token or cron secret required"),
        (status = 429, description = "Cleanup triggered too often")
    ),
    tag = "admin",
    security(
        ("admin_token" = []),
        ("cron_secret" = [])
    )
)]
pub async fn run_cleanup(
    State(service): State<Arc<CleanupService>>,
) -> Result<Json<ApiResponse<CleanupResponseDto>>> {
    let report = service.run().await?;
    Ok(Json(ApiResponse::success(
        Some(report.into()),
        Some(format!(
            "Deleted {} of {} expired file(s)",
            report.files_deleted, report.files_found
        )),
        None,
    )))
}
