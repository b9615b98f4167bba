use axum::{routing::get, Router};
use std::sync::Arc;

use crate::features::statistics::handlers::{get_download_history, get_file_stats};
use crate::features::statistics::services::StatisticsService;

/// Statistics routes (require JWT authentication)
pub fn protected_routes(service: Arc<StatisticsService>) -> Router {
    Router::new()
        .route("/api/files/stats/{id}", get(get_file_stats))
        .route("/api/files/download-history/{id}", get(get_download_history))
        .with_state(service)
}
