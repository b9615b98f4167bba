use std::sync::Arc;

use axum::{routing::post, Router};

use crate::features::admin::handlers;
use crate::features::admin::services::CleanupService;

/// Maintenance routes; the caller wraps them in the admin gate
pub fn routes(cleanup_service: Arc<CleanupService>) -> Router {
    Router::new()
        .route("/api/admin/cleanup", post(handlers::run_cleanup))
        .with_state(cleanup_service)
}
