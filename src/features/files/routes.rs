use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::features::files::handlers::{
    delete_file, download_file, get_file_details, get_file_info, list_my_files, upload_file,
};
use crate::features::files::services::FileService;

/// Share-link routes; callers may be anonymous (optional auth)
pub fn public_routes(file_service: Arc<FileService>, max_body_size: usize) -> Router {
    Router::new()
        .route(
            "/api/files/upload",
            post(upload_file).layer(DefaultBodyLimit::max(max_body_size)),
        )
        .route("/api/files/{share_token}", get(get_file_info))
        .route("/api/files/{share_token}/download", get(download_file))
        .with_state(file_service)
}

/// Owner routes (require JWT authentication)
pub fn protected_routes(file_service: Arc<FileService>) -> Router {
    Router::new()
        .route("/api/files/my", get(list_my_files))
        .route(
            "/api/files/info/{id}",
            get(get_file_details).delete(delete_file),
        )
        .with_state(file_service)
}
